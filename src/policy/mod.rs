/*!
 * Policy
 * Per-app overrides and global toggles, resolved fresh for every decision
 */

pub mod store;
pub mod types;

pub use store::{MemoryPolicyStore, PolicyStore};
pub use types::{AppPolicy, GlobalToggles};

use crate::core::types::Score;
use crate::process::core::types::{AppInfo, ManageMode};
use tracing::warn;

/// Effective policy for one application at one point in time
///
/// A failed per-app read leaves `app` empty, which turns every per-app
/// feature off.
#[derive(Debug, Clone)]
pub struct PolicyView {
    toggles: GlobalToggles,
    app: Option<AppPolicy>,
}

impl PolicyView {
    /// Read toggles and the app's policy from `store`
    pub fn read(store: &dyn PolicyStore, package: &str) -> Self {
        let toggles = store.toggles();
        let app = match store.app_policy(package) {
            Ok(policy) => Some(policy),
            Err(e) => {
                warn!(package, error = %e, "Policy read failed, treating features as disabled");
                None
            }
        };
        Self { toggles, app }
    }

    #[inline]
    #[must_use]
    pub fn toggles(&self) -> GlobalToggles {
        self.toggles
    }

    #[must_use]
    pub fn foreground_trim_allowed(&self) -> bool {
        self.toggles.foreground_trim
            && self
                .app
                .as_ref()
                .is_some_and(|p| p.enable_foreground_trim.unwrap_or(true))
    }

    #[must_use]
    pub fn background_trim_allowed(&self) -> bool {
        self.toggles.background_trim
            && self
                .app
                .as_ref()
                .is_some_and(|p| p.enable_background_trim.unwrap_or(true))
    }

    #[must_use]
    pub fn compaction_allowed(&self) -> bool {
        self.toggles.compaction && self.reclaim_enabled()
    }

    #[must_use]
    pub fn gc_allowed(&self) -> bool {
        self.toggles.background_gc && self.reclaim_enabled()
    }

    #[must_use]
    pub fn custom_main_score(&self) -> Option<Score> {
        self.app.as_ref().and_then(|p| p.custom_main_score)
    }

    /// Pick the should-manage function for an application
    #[must_use]
    pub fn manage_mode(&self, info: &AppInfo) -> ManageMode {
        if !self.reclaim_enabled() {
            ManageMode::Never
        } else if info.is_system && !self.toggles.manage_system_apps {
            ManageMode::Never
        } else if self.toggles.require_surface {
            ManageMode::WithSurface
        } else {
            ManageMode::Always
        }
    }

    fn reclaim_enabled(&self) -> bool {
        self.app
            .as_ref()
            .is_some_and(|p| p.enable_background_reclaim.unwrap_or(true))
    }
}
