/*!
 * Memory Reclamation
 * Compaction and trim schedulers sharing one per-process result cache
 */

pub mod cache;
pub mod compaction;
mod hooks;
pub mod trim;
pub mod types;

// Re-export for convenience
pub use cache::{ResultCache, ResultEntry};
pub use compaction::CompactionScheduler;
pub use hooks::ReclaimHooks;
pub use trim::{TrimScheduler, TrimTier};
pub use types::*;
