/*!
 * Guarded Tasks
 *
 * Every scheduled unit of reclamation work runs behind a panic boundary so a
 * misbehaving host adapter cannot take down the scheduler or its siblings.
 */

use super::types::Pid;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::error;

/// Context attached to a guarded task for diagnostics
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub name: &'static str,
    pub pid: Option<Pid>,
    pub package: Option<String>,
}

impl TaskContext {
    #[inline]
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pid: None,
            package: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn with_process(mut self, pid: Pid, package: &str) -> Self {
        self.pid = Some(pid);
        self.package = Some(package.to_string());
        self
    }
}

/// Run a future to completion, absorbing any panic it raises
///
/// Returns `false` when the future panicked.
pub async fn run_guarded<F>(context: &TaskContext, future: F) -> bool
where
    F: Future<Output = ()>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(()) => true,
        Err(payload) => {
            error!(
                task = context.name,
                pid = ?context.pid,
                package = ?context.package,
                panic = %panic_message(payload.as_ref()),
                "Scheduled task panicked"
            );
            false
        }
    }
}

/// Spawn a future on `runtime` behind a panic boundary
pub fn spawn_guarded<F>(runtime: &Handle, context: TaskContext, future: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    runtime.spawn(async move {
        run_guarded(&context, future).await;
    })
}

/// Run a synchronous closure, absorbing any panic it raises
pub fn call_guarded<F>(context: &TaskContext, f: F) -> bool
where
    F: FnOnce(),
{
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => true,
        Err(payload) => {
            error!(
                task = context.name,
                pid = ?context.pid,
                package = ?context.package,
                panic = %panic_message(payload.as_ref()),
                "Lifecycle handler panicked"
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
