/*!
 * Compaction Scheduler
 *
 * Turns host score changes into debounced compaction requests.
 *
 * # Pending work
 *
 * At most one pending request exists per pid. Each request carries a
 * generation; scheduling again aborts the old task and replaces the entry,
 * and a task that wakes up with a stale generation does nothing. When a task
 * fires it re-validates the process (still alive, app still IDLE, still
 * reclaimable) before calling the host.
 */

use super::decision::{Decider, ScoreChange};
use crate::core::config::CompactionConfig;
use crate::core::task::{spawn_guarded, TaskContext};
use crate::core::types::{Pid, Score};
use crate::host::{HostPrimitives, HostProfile};
use crate::memory::cache::ResultCache;
use crate::memory::types::{CompactLevel, OptimizerKind, Outcome};
use crate::monitoring::ReclaimStats;
use crate::policy::{PolicyStore, PolicyView};
use crate::process::core::traits::ProcessCleanup;
use crate::process::core::types::AppGroup;
use crate::process::management::{AppRegistry, ProcessHandle};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

struct PendingCompaction {
    generation: u64,
    level: CompactLevel,
    task: JoinHandle<()>,
}

pub struct CompactionScheduler {
    runtime: Handle,
    registry: Arc<AppRegistry>,
    host: Arc<dyn HostPrimitives>,
    policy: Arc<dyn PolicyStore>,
    stats: Arc<ReclaimStats>,
    config: CompactionConfig,
    decider: Decider,
    cache: ResultCache,
    reclaimable: DashSet<Pid>,
    pending: DashMap<Pid, PendingCompaction>,
    generation: AtomicU64,
}

impl CompactionScheduler {
    pub fn new(
        runtime: Handle,
        registry: Arc<AppRegistry>,
        host: Arc<dyn HostPrimitives>,
        policy: Arc<dyn PolicyStore>,
        stats: Arc<ReclaimStats>,
        profile: &HostProfile,
        config: CompactionConfig,
    ) -> Self {
        info!(
            profile = profile.name,
            debounce_ms = config.debounce.as_millis() as u64,
            "Compaction scheduler initialized"
        );
        Self {
            runtime,
            registry,
            host,
            policy,
            stats,
            decider: Decider::new(profile.bands, config.throttle),
            config,
            cache: ResultCache::new(OptimizerKind::Compaction),
            reclaimable: DashSet::new(),
            pending: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    /// Mark processes as reclaimable
    pub fn register(&self, pids: &[Pid]) {
        for &pid in pids {
            self.reclaimable.insert(pid);
        }
    }

    /// Stop treating processes as reclaimable and cancel their pending work
    pub fn release(&self, pids: &[Pid]) {
        for &pid in pids {
            self.forget(pid);
        }
    }

    pub fn forget(&self, pid: Pid) {
        self.reclaimable.remove(&pid);
        if let Some((_, pending)) = self.pending.remove(&pid) {
            pending.task.abort();
            debug!(pid, level = %pending.level, "Pending compaction cancelled");
        }
    }

    #[inline]
    pub fn is_reclaimable(&self, pid: Pid) -> bool {
        self.reclaimable.contains(&pid)
    }

    #[inline]
    pub fn is_pending(&self, pid: Pid) -> bool {
        self.pending.contains_key(&pid)
    }

    pub fn pending_level(&self, pid: Pid) -> Option<CompactLevel> {
        self.pending.get(&pid).map(|p| p.level)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// React to a host score change
    ///
    /// Returns the level that was scheduled, if any.
    pub fn on_score_changed(
        self: &Arc<Self>,
        process: &ProcessHandle,
        previous: Score,
        current: Score,
    ) -> Option<CompactLevel> {
        let pid = process.pid();
        if !self.is_eligible(process) {
            return None;
        }
        let policy = PolicyView::read(self.policy.as_ref(), &process.identity().package);
        if !policy.compaction_allowed() {
            return None;
        }

        let last = self.cache.compute_if_absent(process);
        let level = self.decider.decide(
            ScoreChange::new(previous, current),
            &last,
            Instant::now(),
            || {
                self.host
                    .is_allowed_to_compact_now(pid, std::time::Instant::now())
            },
        )?;

        self.schedule(process, level);
        Some(level)
    }

    /// Stop every pending request
    pub fn shutdown(&self) {
        let pids: Vec<Pid> = self.pending.iter().map(|p| *p.key()).collect();
        for pid in pids {
            if let Some((_, pending)) = self.pending.remove(&pid) {
                pending.task.abort();
            }
        }
        info!("Compaction scheduler stopped");
    }

    fn schedule(self: &Arc<Self>, process: &ProcessHandle, level: CompactLevel) {
        let pid = process.pid();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let scheduler = Arc::downgrade(self);
        let delay = self.config.debounce;
        let context = TaskContext::new("compaction").with_process(pid, &process.identity().package);

        let spawn = move || {
            spawn_guarded(&self.runtime, context, async move {
                tokio::time::sleep(delay).await;
                fire(scheduler, pid, generation);
            })
        };

        match self.pending.entry(pid) {
            Entry::Occupied(mut occupied) => {
                let pending = occupied.get_mut();
                pending.task.abort();
                pending.generation = generation;
                pending.level = level;
                pending.task = spawn();
                self.stats.inc_compactions_replaced();
                debug!(pid, %level, "Pending compaction replaced");
            }
            Entry::Vacant(vacant) => {
                vacant.insert(PendingCompaction {
                    generation,
                    level,
                    task: spawn(),
                });
                debug!(pid, %level, "Compaction scheduled");
            }
        }
        self.stats.inc_compactions_scheduled();
    }

    fn is_eligible(&self, process: &ProcessHandle) -> bool {
        self.reclaimable.contains(&process.pid())
            && self
                .registry
                .app(process.identity())
                .is_some_and(|app| app.group() == AppGroup::Idle)
    }

    fn run(&self, pid: Pid, generation: u64) {
        let Some((_, pending)) = self
            .pending
            .remove_if(&pid, |_, p| p.generation == generation)
        else {
            return;
        };
        let level = pending.level;

        let Some(process) = self.registry.process(pid) else {
            debug!(pid, "Process gone before compaction");
            return;
        };

        if !self.is_eligible(&process) {
            self.cache.update(&process, |entry| entry.outcome = Outcome::Unnecessary);
            self.stats.inc_compactions_unnecessary();
            debug!(pid, %level, "Compaction no longer necessary");
            return;
        }

        let outcome = match self.host.request_compaction(pid, level) {
            Ok(()) => {
                self.stats.inc_compactions_succeeded();
                info!(pid, package = %process.identity().package, %level, "Compacted");
                Outcome::Success
            }
            Err(e) => {
                self.stats.inc_compactions_failed();
                warn!(pid, %level, error = %e, "Compaction failed");
                if e.is_process_gone() {
                    self.reclaimable.remove(&pid);
                }
                Outcome::Problem
            }
        };
        let now = Instant::now();
        self.cache
            .update(&process, |entry| entry.record(outcome, level.into(), now));
    }
}

fn fire(scheduler: Weak<CompactionScheduler>, pid: Pid, generation: u64) {
    if let Some(scheduler) = scheduler.upgrade() {
        scheduler.run(pid, generation);
    }
}

impl ProcessCleanup for CompactionScheduler {
    fn forget_process(&self, pid: Pid) {
        self.forget(pid);
    }
}
