/*!
 * Policy Types
 * Per-application overrides and global feature toggles
 */

use crate::core::types::Score;
use serde::{Deserialize, Serialize};

/// Per-application overrides; `None` means "follow the global toggle"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct AppPolicy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_foreground_trim: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_background_trim: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_background_reclaim: Option<bool>,
    /// Score imposed on the application's main process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_main_score: Option<Score>,
}

/// Process-wide feature switches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct GlobalToggles {
    pub foreground_trim: bool,
    pub background_trim: bool,
    pub compaction: bool,
    pub background_gc: bool,
    pub manage_system_apps: bool,
    /// Stop managing an application once its last surface is destroyed
    pub require_surface: bool,
}

impl Default for GlobalToggles {
    fn default() -> Self {
        Self {
            foreground_trim: true,
            background_trim: true,
            compaction: true,
            background_gc: false,
            manage_system_apps: false,
            require_surface: false,
        }
    }
}
