/*!
 * Host Boundary
 * Capability interface, version profiles and the recording implementation
 */

pub mod profile;
pub mod recording;
pub mod traits;

pub use profile::{HostProfile, ScoreBands};
pub use recording::{HostCall, RecordingHost};
pub use traits::HostPrimitives;
