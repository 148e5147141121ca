/*!
 * Process Types
 * Identities, groups and surface events for lifecycle tracking
 */

use crate::core::types::{Pid, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// (user namespace, package) pair naming a monitored application instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Identity {
    pub user: UserId,
    pub package: String,
}

impl Identity {
    #[inline]
    #[must_use]
    pub fn new(user: UserId, package: impl Into<String>) -> Self {
        Self {
            user,
            package: package.into(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.package, self.user)
    }
}

/// Opaque handle for a visible surface (window/activity) of an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceToken(pub u64);

/// Coarse lifecycle classification of an application
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppGroup {
    /// Never observed with a visible surface
    #[default]
    None = 0,
    /// Has a foreground-visible surface
    Active = 1,
    /// Alive without a foreground-visible surface
    Idle = 2,
    /// Terminal; the record is being purged
    Dead = 3,
}

impl AppGroup {
    #[inline]
    #[must_use]
    pub const fn from_u8(raw: u8) -> Self {
        match raw {
            1 => AppGroup::Active,
            2 => AppGroup::Idle,
            3 => AppGroup::Dead,
            _ => AppGroup::None,
        }
    }
}

/// Surface visibility change reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceEventKind {
    Shown,
    Hidden,
    Destroyed,
}

/// Decision function selecting whether reclamation manages an application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManageMode {
    #[default]
    Always,
    Never,
    /// Managed while at least one surface is tracked
    WithSurface,
}

/// Application info resolved by the host adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppInfo {
    pub uid: u32,
    #[serde(default)]
    pub is_system: bool,
}

/// Everything needed to build a fresh `AppRecord`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationContext {
    pub info: AppInfo,
    pub manage_mode: ManageMode,
}

/// A surface visibility event bound for the lifecycle router
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceEvent {
    pub kind: SurfaceEventKind,
    pub identity: Identity,
    pub token: SurfaceToken,
}

/// Group change performed by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: AppGroup,
    pub to: AppGroup,
}

/// Work items drained by the lifecycle worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Surface(SurfaceEvent),
    ProcessCreated {
        pid: Pid,
        identity: Identity,
        is_main: bool,
    },
    ProcessDied {
        pid: Pid,
        identity: Identity,
    },
    /// Purge the application and every process it still owns
    AppRemoved { identity: Identity },
}

impl LifecycleEvent {
    /// Identity used to pick the worker queue
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &Identity {
        match self {
            LifecycleEvent::Surface(event) => &event.identity,
            LifecycleEvent::ProcessCreated { identity, .. } => identity,
            LifecycleEvent::ProcessDied { identity, .. } => identity,
            LifecycleEvent::AppRemoved { identity } => identity,
        }
    }
}
