/*!
 * Reclaim Kernel Library
 *
 * Application lifecycle tracking plus priority-score-aware compaction and
 * tiered trim scheduling, driven by host events.
 */

pub mod api;
pub mod core;
pub mod host;
pub mod memory;
pub mod monitoring;
pub mod policy;
pub mod process;

// Re-exports
pub use api::{AppSnapshot, HostEvent, HostEventSink, Kernel, KernelBuilder, ProcessSnapshot};
pub use self::core::config::KernelConfig;
pub use self::core::errors::{ConfigError, HostError, KernelError, PolicyError};
pub use self::core::types::{KernelResult, Pid, Score, UserId};
pub use host::{HostPrimitives, HostProfile, RecordingHost};
pub use memory::{CompactLevel, Outcome, ReclaimLevel, TrimSeverity, TrimTier};
pub use monitoring::{init_tracing, ReclaimStatsSnapshot};
pub use policy::{AppPolicy, GlobalToggles, MemoryPolicyStore, PolicyStore};
pub use process::{AppGroup, Identity, SurfaceEventKind, SurfaceToken};
