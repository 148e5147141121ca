/*!
 * Compaction
 * Score-driven, debounced and throttled compaction requests
 */

pub mod decision;
mod scheduler;

pub use decision::{Decider, ScoreChange};
pub use scheduler::CompactionScheduler;
