/*!
 * Monitoring
 * Tracing setup and lock-free reclamation counters
 */

mod stats;
mod tracer;

pub use stats::{ReclaimStats, ReclaimStatsSnapshot};
pub use tracer::{generate_run_id, init_tracing};
