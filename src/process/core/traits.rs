/*!
 * Process Traits
 * Seams between lifecycle bookkeeping and the reclamation schedulers
 */

use super::types::{Identity, LifecycleEvent};
use crate::core::types::Pid;

/// Callback fired by the registry whenever a process leaves it
///
/// Implementors must drop every reference they hold to `pid`, whether or not
/// they still track it.
pub trait ProcessCleanup: Send + Sync {
    fn forget_process(&self, pid: Pid);
}

/// Side effects of group transitions
///
/// Called by the router while it holds the application's lock, so
/// implementations must not lock the application record again.
pub trait GroupHooks: Send + Sync {
    /// The application gained a foreground surface
    fn became_active(&self, identity: &Identity, pids: &[Pid]);

    /// The application lost its foreground surface
    ///
    /// `managed` is the record's should-manage decision at transition time.
    fn became_idle(&self, identity: &Identity, pids: &[Pid], managed: bool);
}

/// Consumer of events drained by the lifecycle worker pool
pub trait LifecycleHandler: Send + Sync + 'static {
    fn handle(&self, event: LifecycleEvent);
}
