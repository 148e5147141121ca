/*!
 * App Registry
 *
 * Sole owner of the identity → AppRecord and pid → ProcessHandle maps.
 *
 * # Lock ordering
 *
 * `apps` shard lock → record lock. Nothing may hold a record lock while
 * touching the `apps` map, and no record lock is taken while a `pids` shard
 * lock is held.
 */

use super::app::AppRecord;
use super::handle::ProcessHandle;
use crate::core::limits::APP_RECORD_POOL_CAPACITY;
use crate::core::types::Pid;
use crate::process::core::traits::ProcessCleanup;
use crate::process::core::types::{CreationContext, Identity};
use crossbeam_queue::ArrayQueue;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

pub struct AppRegistry {
    apps: DashMap<Identity, Arc<AppRecord>>,
    processes: DashMap<Pid, Arc<ProcessHandle>>,
    cleanups: RwLock<Vec<Weak<dyn ProcessCleanup>>>,
    pool: ArrayQueue<Arc<AppRecord>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        info!("App registry initialized");
        Self {
            apps: DashMap::new(),
            processes: DashMap::new(),
            cleanups: RwLock::new(Vec::new()),
            pool: ArrayQueue::new(APP_RECORD_POOL_CAPACITY),
        }
    }

    /// Register a callback fired for every process leaving the registry
    ///
    /// Only a weak reference is kept; a dropped callback is skipped.
    pub fn register_cleanup(&self, cleanup: &Arc<dyn ProcessCleanup>) {
        self.cleanups.write().push(Arc::downgrade(cleanup));
    }

    /// Atomic create-if-absent
    pub fn get_or_create_app(&self, identity: &Identity, context: CreationContext) -> Arc<AppRecord> {
        if let Some(app) = self.apps.get(identity) {
            return Arc::clone(app.value());
        }
        let app = self
            .apps
            .entry(identity.clone())
            .or_insert_with(|| {
                debug!(app = %identity, "Creating app record");
                self.allocate(identity.clone(), context)
            });
        Arc::clone(app.value())
    }

    /// Atomic create-if-absent; the owning app is resolved or created first
    pub fn get_or_create_process(
        &self,
        pid: Pid,
        identity: &Identity,
        is_main: bool,
        context: CreationContext,
    ) -> Arc<ProcessHandle> {
        // A record retired between lookup and attach is already gone from
        // the map, so the next lookup yields a fresh one.
        loop {
            let app = self.get_or_create_app(identity, context);
            if app.attach(pid) {
                break;
            }
        }

        let handle = self
            .processes
            .entry(pid)
            .or_insert_with(|| {
                debug!(pid, app = %identity, is_main, "Tracking process");
                Arc::new(ProcessHandle::new(pid, identity.clone(), is_main))
            });
        Arc::clone(handle.value())
    }

    pub fn app(&self, identity: &Identity) -> Option<Arc<AppRecord>> {
        self.apps.get(identity).map(|app| Arc::clone(app.value()))
    }

    pub fn process(&self, pid: Pid) -> Option<Arc<ProcessHandle>> {
        self.processes.get(&pid).map(|handle| Arc::clone(handle.value()))
    }

    pub fn apps(&self) -> Vec<Arc<AppRecord>> {
        self.apps.iter().map(|app| Arc::clone(app.value())).collect()
    }

    pub fn processes(&self) -> Vec<Arc<ProcessHandle>> {
        self.processes
            .iter()
            .map(|handle| Arc::clone(handle.value()))
            .collect()
    }

    pub fn app_count(&self) -> usize {
        self.apps.len()
    }

    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    /// Mark the app DEAD, purge it with all of its processes
    ///
    /// Returns false when the identity is unknown.
    pub fn remove_app(&self, identity: &Identity) -> bool {
        let Some((_, app)) = self.apps.remove(identity) else {
            return false;
        };
        let pids = app.retire();
        for pid in &pids {
            self.processes
                .remove_if(pid, |_, handle| handle.identity() == identity);
            self.run_cleanups(*pid);
        }
        info!(app = %identity, processes = pids.len(), "App removed");
        self.recycle(app);
        true
    }

    /// Purge a process; purges its app too when it was the last one
    ///
    /// Returns the removed handle, or `None` when the pid is unknown.
    pub fn remove_process(&self, pid: Pid) -> Option<Arc<ProcessHandle>> {
        let (_, handle) = self.processes.remove(&pid)?;
        self.run_cleanups(pid);

        let identity = handle.identity();
        let remaining = match self.app(identity) {
            Some(app) => app.detach(pid),
            None => return Some(handle),
        };
        debug!(pid, app = %identity, remaining, "Process removed");

        if remaining == 0 {
            if let Some((_, app)) = self
                .apps
                .remove_if(identity, |_, app| app.try_retire())
            {
                info!(app = %identity, "Last process died, app removed");
                self.recycle(app);
            }
        }
        Some(handle)
    }

    fn run_cleanups(&self, pid: Pid) {
        let cleanups: Vec<Arc<dyn ProcessCleanup>> = self
            .cleanups
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        for cleanup in cleanups {
            cleanup.forget_process(pid);
        }
    }

    fn allocate(&self, identity: Identity, context: CreationContext) -> Arc<AppRecord> {
        if let Some(mut recycled) = self.pool.pop() {
            if let Some(record) = Arc::get_mut(&mut recycled) {
                record.reset(identity, context);
                return recycled;
            }
        }
        Arc::new(AppRecord::new(identity, context))
    }

    /// Keep a purged record for reuse when nobody else still holds it
    fn recycle(&self, app: Arc<AppRecord>) {
        if Arc::strong_count(&app) == 1 {
            let _ = self.pool.push(app);
        }
    }

    #[cfg(test)]
    pub(crate) fn pooled(&self) -> usize {
        self.pool.len()
    }
}

impl Default for AppRegistry {
    fn default() -> Self {
        Self::new()
    }
}
