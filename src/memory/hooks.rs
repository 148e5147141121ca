/*!
 * Reclamation Hooks
 * Wires group transitions into the compaction and trim schedulers
 */

use super::compaction::CompactionScheduler;
use super::trim::TrimScheduler;
use crate::core::types::Pid;
use crate::process::core::traits::GroupHooks;
use crate::process::core::types::Identity;
use std::sync::Arc;
use tracing::debug;

pub struct ReclaimHooks {
    compaction: Arc<CompactionScheduler>,
    trim: Arc<TrimScheduler>,
}

impl ReclaimHooks {
    pub fn new(compaction: Arc<CompactionScheduler>, trim: Arc<TrimScheduler>) -> Self {
        Self { compaction, trim }
    }
}

impl GroupHooks for ReclaimHooks {
    fn became_active(&self, identity: &Identity, pids: &[Pid]) {
        debug!(app = %identity, processes = pids.len(), "App became active");
        self.compaction.release(pids);
        self.trim.enter_foreground(pids);
    }

    fn became_idle(&self, identity: &Identity, pids: &[Pid], managed: bool) {
        debug!(app = %identity, processes = pids.len(), managed, "App became idle");
        if managed {
            self.compaction.register(pids);
            self.trim.enter_background(pids);
        } else {
            self.compaction.release(pids);
            self.trim.leave(pids);
        }
    }
}
