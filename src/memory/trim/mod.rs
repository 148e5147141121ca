/*!
 * Trim
 * Foreground and background trim sweeps plus the first-idle one-shot
 */

mod scheduler;
pub mod sweep;

pub use scheduler::{TrimScheduler, TrimTier};
pub use sweep::{SweepCommand, SweepTask};
