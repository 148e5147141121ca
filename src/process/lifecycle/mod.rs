/*!
 * Process Lifecycle
 * Surface-event routing and the worker pool that drains lifecycle events
 */

mod dispatcher;
mod router;

pub use dispatcher::EventDispatcher;
pub use router::LifecycleRouter;
