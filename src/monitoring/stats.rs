/*!
 * Lock-Free Reclamation Statistics
 * Atomic counters updated on hot lifecycle and scheduler paths
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters shared by the router and both schedulers
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - All operations use relaxed ordering; snapshots are monitoring-grade
#[repr(C, align(64))]
#[derive(Default)]
pub struct ReclaimStats {
    events_handled: AtomicU64,
    events_dropped: AtomicU64,
    transitions: AtomicU64,
    compactions_scheduled: AtomicU64,
    compactions_replaced: AtomicU64,
    compactions_succeeded: AtomicU64,
    compactions_failed: AtomicU64,
    compactions_unnecessary: AtomicU64,
    trims_delivered: AtomicU64,
    trims_failed: AtomicU64,
    gc_hints: AtomicU64,
    members_dropped: AtomicU64,
    sweeps: AtomicU64,
}

macro_rules! counter {
    ($($inc:ident => $field:ident),* $(,)?) => {
        $(
            #[inline(always)]
            pub fn $inc(&self) {
                self.$field.fetch_add(1, Ordering::Relaxed);
            }
        )*
    };
}

impl ReclaimStats {
    pub fn new() -> Self {
        Self::default()
    }

    counter! {
        inc_events_handled => events_handled,
        inc_events_dropped => events_dropped,
        inc_transitions => transitions,
        inc_compactions_scheduled => compactions_scheduled,
        inc_compactions_replaced => compactions_replaced,
        inc_compactions_succeeded => compactions_succeeded,
        inc_compactions_failed => compactions_failed,
        inc_compactions_unnecessary => compactions_unnecessary,
        inc_trims_delivered => trims_delivered,
        inc_trims_failed => trims_failed,
        inc_gc_hints => gc_hints,
        inc_members_dropped => members_dropped,
        inc_sweeps => sweeps,
    }

    /// Get snapshot of current stats
    ///
    /// # Note
    /// Counters may be mutually inconsistent under concurrent updates, but each
    /// individual value is accurate.
    pub fn snapshot(&self) -> ReclaimStatsSnapshot {
        ReclaimStatsSnapshot {
            events_handled: self.events_handled.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            transitions: self.transitions.load(Ordering::Relaxed),
            compactions_scheduled: self.compactions_scheduled.load(Ordering::Relaxed),
            compactions_replaced: self.compactions_replaced.load(Ordering::Relaxed),
            compactions_succeeded: self.compactions_succeeded.load(Ordering::Relaxed),
            compactions_failed: self.compactions_failed.load(Ordering::Relaxed),
            compactions_unnecessary: self.compactions_unnecessary.load(Ordering::Relaxed),
            trims_delivered: self.trims_delivered.load(Ordering::Relaxed),
            trims_failed: self.trims_failed.load(Ordering::Relaxed),
            gc_hints: self.gc_hints.load(Ordering::Relaxed),
            members_dropped: self.members_dropped.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of `ReclaimStats`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReclaimStatsSnapshot {
    pub events_handled: u64,
    pub events_dropped: u64,
    pub transitions: u64,
    pub compactions_scheduled: u64,
    pub compactions_replaced: u64,
    pub compactions_succeeded: u64,
    pub compactions_failed: u64,
    pub compactions_unnecessary: u64,
    pub trims_delivered: u64,
    pub trims_failed: u64,
    pub gc_hints: u64,
    pub members_dropped: u64,
    pub sweeps: u64,
}
