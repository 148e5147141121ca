/*!
 * Kernel API
 * Inbound host interface, the kernel facade and control-surface snapshots
 */

pub mod events;
mod kernel;
pub mod snapshot;

pub use events::{HostEvent, HostEventSink};
pub use kernel::{Kernel, KernelBuilder};
pub use snapshot::{AppSnapshot, ProcessSnapshot, ResultSnapshot};
