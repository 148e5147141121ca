/*!
 * Host Traits
 * Typed capability interface implemented by the host adapter
 */

use crate::core::errors::HostError;
use crate::core::types::Pid;
use crate::memory::types::{CompactLevel, TrimSeverity};
use crate::process::core::types::{AppInfo, Identity};
use std::time::Instant;

/// Outbound primitives the kernel asks the host to perform
///
/// Implementations must be cheap and non-blocking: they are invoked from
/// lifecycle workers and scheduler tasks.
pub trait HostPrimitives: Send + Sync {
    /// Look up application info; `None` drops the triggering event
    fn resolve_app(&self, identity: &Identity) -> Option<AppInfo>;

    /// Ask the host to compact a process
    fn request_compaction(&self, pid: Pid, level: CompactLevel) -> Result<(), HostError>;

    /// Ask the host to deliver a trim notification
    fn request_trim(&self, pid: Pid, severity: TrimSeverity) -> Result<(), HostError>;

    /// Ask the host to hint a garbage collection
    fn request_gc(&self, pid: Pid) -> Result<(), HostError>;

    /// Host staleness check that independently qualifies a process for full compaction
    fn is_allowed_to_compact_now(&self, pid: Pid, now: Instant) -> bool;

    /// Whether the device is currently interactive (screen on, unlocked)
    fn is_globally_interactive(&self) -> bool;
}
