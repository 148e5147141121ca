/*!
 * Event Dispatcher
 *
 * Fixed pool of lifecycle workers. Each worker owns one FIFO queue and events
 * are sharded onto queues by identity hash, so all events for one
 * application are handled by the same worker in arrival order. No ordering
 * holds across applications.
 */

use crate::core::task::{call_guarded, TaskContext};
use crate::process::core::traits::LifecycleHandler;
use crate::process::core::types::{Identity, LifecycleEvent, SurfaceEvent};
use ahash::RandomState;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

enum Job {
    Event(LifecycleEvent),
    /// Completes once every job queued before it has been handled
    Barrier(oneshot::Sender<()>),
}

pub struct EventDispatcher {
    queues: RwLock<Vec<flume::Sender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    hasher: RandomState,
    worker_count: usize,
}

impl EventDispatcher {
    /// Spawn `workers` lifecycle workers feeding `handler`
    pub fn spawn(runtime: &Handle, workers: usize, handler: Arc<dyn LifecycleHandler>) -> Self {
        let worker_count = workers.max(1);
        let mut queues = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);

        for index in 0..worker_count {
            let (tx, rx) = flume::unbounded();
            queues.push(tx);
            handles.push(runtime.spawn(run_worker(index, rx, Arc::clone(&handler))));
        }

        info!(workers = worker_count, "Lifecycle dispatcher started");
        Self {
            queues: RwLock::new(queues),
            workers: Mutex::new(handles),
            hasher: RandomState::new(),
            worker_count,
        }
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Queue an event behind every earlier event for the same application
    ///
    /// Returns false once the dispatcher has shut down.
    pub fn submit(&self, event: LifecycleEvent) -> bool {
        let queues = self.queues.read();
        if queues.is_empty() {
            return false;
        }
        let shard = self.shard(event.identity(), queues.len());
        queues[shard].send(Job::Event(event)).is_ok()
    }

    /// Wait until every event submitted so far has been handled
    pub async fn flush(&self) {
        let barriers: Vec<oneshot::Receiver<()>> = {
            let queues = self.queues.read();
            queues
                .iter()
                .filter_map(|queue| {
                    let (tx, rx) = oneshot::channel();
                    queue.send(Job::Barrier(tx)).ok().map(|()| rx)
                })
                .collect()
        };
        for barrier in barriers {
            let _ = barrier.await;
        }
    }

    /// Close the queues and wait for workers to drain them
    pub async fn shutdown(&self) {
        self.queues.write().clear();
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Lifecycle worker shutdown error");
            }
        }
        info!("Lifecycle dispatcher stopped");
    }

    fn shard(&self, identity: &Identity, shards: usize) -> usize {
        (self.hasher.hash_one(identity) % shards as u64) as usize
    }
}

async fn run_worker(index: usize, rx: flume::Receiver<Job>, handler: Arc<dyn LifecycleHandler>) {
    debug!(worker = index, "Lifecycle worker started");
    while let Ok(job) = rx.recv_async().await {
        match job {
            Job::Event(event) => {
                let context = event_context(&event);
                call_guarded(&context, || handler.handle(event));
            }
            Job::Barrier(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!(worker = index, "Lifecycle worker exiting");
}

fn event_context(event: &LifecycleEvent) -> TaskContext {
    let context = TaskContext::new("lifecycle_event");
    match event {
        LifecycleEvent::Surface(SurfaceEvent { identity, .. })
        | LifecycleEvent::AppRemoved { identity } => TaskContext {
            package: Some(identity.package.clone()),
            ..context
        },
        LifecycleEvent::ProcessCreated { pid, identity, .. }
        | LifecycleEvent::ProcessDied { pid, identity } => {
            context.with_process(*pid, &identity.package)
        }
    }
}
