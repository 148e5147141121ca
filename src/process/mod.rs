/*!
 * Process Module
 * Application records, lifecycle routing and event dispatch
 */

pub mod core;
pub mod lifecycle;
pub mod management;

// Re-export for convenience
pub use self::core::types::{
    AppGroup, AppInfo, CreationContext, Identity, LifecycleEvent, ManageMode, SurfaceEvent,
    SurfaceEventKind, SurfaceToken, Transition,
};
pub use lifecycle::{EventDispatcher, LifecycleRouter};
pub use management::{AppRecord, AppRegistry, ProcessHandle};
