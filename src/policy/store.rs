/*!
 * Policy Store
 * Read contract consumed by the kernel plus an in-memory implementation
 */

use super::types::{AppPolicy, GlobalToggles};
use crate::core::errors::PolicyError;
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::info;

/// Read-only policy source
///
/// Values may change between any two calls; the kernel re-reads on every
/// decision and never caches.
pub trait PolicyStore: Send + Sync {
    fn app_policy(&self, package: &str) -> Result<AppPolicy, PolicyError>;

    fn toggles(&self) -> GlobalToggles;
}

/// Concurrent in-memory policy store
///
/// Toggles are swapped atomically so readers never see a half-updated set.
pub struct MemoryPolicyStore {
    apps: DashMap<String, AppPolicy>,
    toggles: ArcSwap<GlobalToggles>,
}

impl MemoryPolicyStore {
    pub fn new() -> Self {
        Self::with_toggles(GlobalToggles::default())
    }

    pub fn with_toggles(toggles: GlobalToggles) -> Self {
        Self {
            apps: DashMap::new(),
            toggles: ArcSwap::from_pointee(toggles),
        }
    }

    pub fn set_app_policy(&self, package: impl Into<String>, policy: AppPolicy) {
        let package = package.into();
        info!(package = %package, ?policy, "App policy updated");
        self.apps.insert(package, policy);
    }

    pub fn remove_app_policy(&self, package: &str) -> Option<AppPolicy> {
        self.apps.remove(package).map(|(_, policy)| policy)
    }

    pub fn set_toggles(&self, toggles: GlobalToggles) {
        info!(?toggles, "Global toggles updated");
        self.toggles.store(Arc::new(toggles));
    }

    /// Apply `f` to a copy of the current toggles and publish the result
    pub fn update_toggles<F>(&self, f: F)
    where
        F: Fn(&mut GlobalToggles),
    {
        self.toggles.rcu(|current| {
            let mut next = **current;
            f(&mut next);
            next
        });
    }
}

impl Default for MemoryPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PolicyStore for MemoryPolicyStore {
    fn app_policy(&self, package: &str) -> Result<AppPolicy, PolicyError> {
        Ok(self
            .apps
            .get(package)
            .map(|policy| policy.clone())
            .unwrap_or_default())
    }

    fn toggles(&self) -> GlobalToggles {
        **self.toggles.load()
    }
}
