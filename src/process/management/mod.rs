/*!
 * Process Management
 * Application records, process handles and the registry that owns them
 */

mod app;
mod handle;
mod registry;

pub use app::{AppRecord, AppStateGuard, InFlightGuard};
pub use handle::ProcessHandle;
pub use registry::AppRegistry;
