/*!
 * Recording Host
 *
 * In-memory `HostPrimitives` that logs and records every request instead of
 * touching a real host. Backs the replay binary and the test suites.
 */

use super::traits::HostPrimitives;
use crate::core::errors::HostError;
use crate::core::types::Pid;
use crate::memory::types::{CompactLevel, TrimSeverity};
use crate::process::core::types::{AppInfo, Identity};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::debug;

/// A request observed by the recording host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCall {
    Compaction { pid: Pid, level: CompactLevel },
    Trim { pid: Pid, severity: TrimSeverity },
    Gc { pid: Pid },
}

/// Host double that succeeds unless told otherwise
#[derive(Default)]
pub struct RecordingHost {
    calls: Mutex<Vec<HostCall>>,
    non_interactive: AtomicBool,
    app_infos: DashMap<Identity, AppInfo>,
    unresolvable: DashSet<Identity>,
    allowed_now: DashSet<Pid>,
    compaction_failures: DashMap<Pid, HostError>,
    trim_failures: DashMap<Pid, HostError>,
    gc_failures: DashMap<Pid, HostError>,
    #[cfg(test)]
    panic_on_compaction: DashSet<Pid>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_interactive(&self, interactive: bool) {
        self.non_interactive.store(!interactive, Ordering::SeqCst);
    }

    pub fn set_app_info(&self, identity: Identity, info: AppInfo) {
        self.app_infos.insert(identity, info);
    }

    /// Make `resolve_app` fail for an identity
    pub fn set_unresolvable(&self, identity: Identity) {
        self.unresolvable.insert(identity);
    }

    pub fn set_allowed_to_compact(&self, pid: Pid, allowed: bool) {
        if allowed {
            self.allowed_now.insert(pid);
        } else {
            self.allowed_now.remove(&pid);
        }
    }

    pub fn fail_compaction(&self, pid: Pid, error: HostError) {
        self.compaction_failures.insert(pid, error);
    }

    pub fn fail_trim(&self, pid: Pid, error: HostError) {
        self.trim_failures.insert(pid, error);
    }

    pub fn fail_gc(&self, pid: Pid, error: HostError) {
        self.gc_failures.insert(pid, error);
    }

    /// Panic inside `request_compaction` for `pid`
    #[cfg(test)]
    pub(crate) fn panic_on_compaction(&self, pid: Pid) {
        self.panic_on_compaction.insert(pid);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().clone()
    }

    pub fn compactions(&self) -> Vec<(Pid, CompactLevel)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match *call {
                HostCall::Compaction { pid, level } => Some((pid, level)),
                _ => None,
            })
            .collect()
    }

    pub fn trims(&self) -> Vec<(Pid, TrimSeverity)> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match *call {
                HostCall::Trim { pid, severity } => Some((pid, severity)),
                _ => None,
            })
            .collect()
    }

    pub fn gc_hints(&self) -> Vec<Pid> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match *call {
                HostCall::Gc { pid } => Some(pid),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, call: HostCall) {
        self.calls.lock().push(call);
    }
}

impl HostPrimitives for RecordingHost {
    fn resolve_app(&self, identity: &Identity) -> Option<AppInfo> {
        if self.unresolvable.contains(identity) {
            return None;
        }
        Some(
            self.app_infos
                .get(identity)
                .map(|info| *info)
                .unwrap_or(AppInfo {
                    uid: identity.user * 100_000,
                    is_system: false,
                }),
        )
    }

    fn request_compaction(&self, pid: Pid, level: CompactLevel) -> Result<(), HostError> {
        #[cfg(test)]
        if self.panic_on_compaction.contains(&pid) {
            panic!("compaction primitive crashed for pid {pid}");
        }
        self.record(HostCall::Compaction { pid, level });
        debug!(pid, %level, "Compaction requested");
        match self.compaction_failures.get(&pid) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn request_trim(&self, pid: Pid, severity: TrimSeverity) -> Result<(), HostError> {
        self.record(HostCall::Trim { pid, severity });
        debug!(pid, level = severity.code(), "Trim requested");
        match self.trim_failures.get(&pid) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn request_gc(&self, pid: Pid) -> Result<(), HostError> {
        self.record(HostCall::Gc { pid });
        debug!(pid, "GC hint requested");
        match self.gc_failures.get(&pid) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn is_allowed_to_compact_now(&self, pid: Pid, _now: Instant) -> bool {
        self.allowed_now.contains(&pid)
    }

    fn is_globally_interactive(&self) -> bool {
        !self.non_interactive.load(Ordering::SeqCst)
    }
}
