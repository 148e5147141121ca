/*!
 * Trim Scheduler
 *
 * Tiered trim notifications:
 *
 * - **Foreground sweep**: periodic trim of foreground members, can be turned
 *   off and on at runtime
 * - **Background sweep**: periodic trim of background members plus an
 *   optional GC hint, offset to start after the first foreground sweep
 * - **First-idle one-shot**: delayed trim the first time a process enters the
 *   background tier, cancelled if it returns to the foreground first
 *
 * Every sweep and one-shot holds the same async gate while it talks to the
 * host, so at most one unit of trim work runs at a time.
 *
 * # Membership
 *
 * A single map from pid to tier keeps the two tiers disjoint: moving a
 * process overwrites its tier.
 */

use super::sweep::SweepTask;
use crate::core::config::TrimConfig;
use crate::core::task::{spawn_guarded, TaskContext};
use crate::core::types::Pid;
use crate::host::{HostPrimitives, HostProfile};
use crate::memory::cache::ResultCache;
use crate::memory::types::{OptimizerKind, Outcome, TrimSeverity};
use crate::monitoring::ReclaimStats;
use crate::policy::{PolicyStore, PolicyView};
use crate::process::core::traits::ProcessCleanup;
use crate::process::management::{AppRegistry, ProcessHandle};
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Trim tier a process belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimTier {
    Foreground,
    Background,
}

struct PendingTrim {
    generation: u64,
    task: JoinHandle<()>,
}

/// Result of delivering one trim request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Delivered,
    Failed,
    Gone,
}

pub struct TrimScheduler {
    runtime: Handle,
    registry: Arc<AppRegistry>,
    host: Arc<dyn HostPrimitives>,
    policy: Arc<dyn PolicyStore>,
    stats: Arc<ReclaimStats>,
    config: TrimConfig,
    foreground_severity: TrimSeverity,
    background_severity: TrimSeverity,
    hidden_severity: TrimSeverity,
    members: DashMap<Pid, TrimTier>,
    idled: DashSet<Pid>,
    first_idle: DashMap<Pid, PendingTrim>,
    generation: AtomicU64,
    gate: tokio::sync::Mutex<()>,
    foreground: Mutex<Option<SweepTask>>,
    background: Mutex<Option<SweepTask>>,
    foreground_results: ResultCache,
    background_results: ResultCache,
    gc_results: ResultCache,
}

impl TrimScheduler {
    pub fn new(
        runtime: Handle,
        registry: Arc<AppRegistry>,
        host: Arc<dyn HostPrimitives>,
        policy: Arc<dyn PolicyStore>,
        stats: Arc<ReclaimStats>,
        profile: &HostProfile,
        config: TrimConfig,
    ) -> Self {
        let foreground_severity = config.foreground_severity.unwrap_or(profile.foreground_trim);
        info!(
            profile = profile.name,
            foreground = ?foreground_severity,
            background = ?profile.background_trim,
            hidden = ?profile.hidden_trim,
            "Trim scheduler initialized"
        );
        Self {
            runtime,
            registry,
            host,
            policy,
            stats,
            config,
            foreground_severity,
            background_severity: profile.background_trim,
            hidden_severity: profile.hidden_trim,
            members: DashMap::new(),
            idled: DashSet::new(),
            first_idle: DashMap::new(),
            generation: AtomicU64::new(0),
            gate: tokio::sync::Mutex::new(()),
            foreground: Mutex::new(None),
            background: Mutex::new(None),
            foreground_results: ResultCache::new(OptimizerKind::ForegroundTrim),
            background_results: ResultCache::new(OptimizerKind::BackgroundTrim),
            gc_results: ResultCache::new(OptimizerKind::GcHint),
        }
    }

    /// Start the periodic sweeps
    pub fn start(self: &Arc<Self>) {
        let first_background = self.config.foreground_interval + self.config.background_offset;
        let weak = Arc::downgrade(self);
        let task = SweepTask::spawn(
            &self.runtime,
            "background_trim",
            first_background,
            self.config.background_interval,
            move || {
                let weak = Weak::clone(&weak);
                async move {
                    match weak.upgrade() {
                        Some(scheduler) => {
                            scheduler.run_background_sweep().await;
                            true
                        }
                        None => false,
                    }
                }
            },
        );
        *self.background.lock() = Some(task);

        if self.config.foreground_enabled {
            self.set_foreground_enabled(true);
        }
    }

    /// Turn the foreground sweep on or off
    ///
    /// Turning it off never interrupts a sweep that is already running.
    pub fn set_foreground_enabled(self: &Arc<Self>, enabled: bool) {
        let mut slot = self.foreground.lock();
        match (enabled, slot.is_some()) {
            (true, false) => {
                let weak = Arc::downgrade(self);
                *slot = Some(SweepTask::spawn(
                    &self.runtime,
                    "foreground_trim",
                    self.config.foreground_interval,
                    self.config.foreground_interval,
                    move || {
                        let weak = Weak::clone(&weak);
                        async move {
                            match weak.upgrade() {
                                Some(scheduler) => {
                                    scheduler.run_foreground_sweep().await;
                                    true
                                }
                                None => false,
                            }
                        }
                    },
                ));
                info!("Foreground trim enabled");
            }
            (false, true) => {
                if let Some(task) = slot.take() {
                    task.stop();
                }
                info!("Foreground trim disabled");
            }
            _ => {}
        }
    }

    pub fn is_foreground_enabled(&self) -> bool {
        self.foreground.lock().is_some()
    }

    pub fn trigger_background(&self) {
        if let Some(task) = self.background.lock().as_ref() {
            task.trigger();
        }
    }

    /// Move processes into the foreground tier, cancelling pending one-shots
    pub fn enter_foreground(&self, pids: &[Pid]) {
        for &pid in pids {
            self.members.insert(pid, TrimTier::Foreground);
            self.cancel_first_idle(pid);
        }
    }

    /// Move processes into the background tier
    ///
    /// The first entry of a process schedules the first-idle one-shot.
    pub fn enter_background(self: &Arc<Self>, pids: &[Pid]) {
        for &pid in pids {
            self.members.insert(pid, TrimTier::Background);
            if self.idled.insert(pid) {
                self.schedule_first_idle(pid);
            }
        }
    }

    /// Drop processes from both tiers without forgetting their history
    pub fn leave(&self, pids: &[Pid]) {
        for &pid in pids {
            self.members.remove(&pid);
            self.cancel_first_idle(pid);
        }
    }

    pub fn forget(&self, pid: Pid) {
        self.members.remove(&pid);
        self.idled.remove(&pid);
        self.cancel_first_idle(pid);
    }

    pub fn tier(&self, pid: Pid) -> Option<TrimTier> {
        self.members.get(&pid).map(|tier| *tier)
    }

    pub fn has_pending_first_idle(&self, pid: Pid) -> bool {
        self.first_idle.contains_key(&pid)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Trim every foreground member once
    pub async fn run_foreground_sweep(&self) {
        let _gate = self.gate.lock().await;
        self.stats.inc_sweeps();
        let pids = self.members_in(TrimTier::Foreground);
        debug!(members = pids.len(), "Foreground sweep");

        for pid in pids {
            let Some(process) = self.resolve_member(pid) else {
                continue;
            };
            let policy = PolicyView::read(self.policy.as_ref(), &process.identity().package);
            if !policy.foreground_trim_allowed() {
                continue;
            }
            self.deliver(&process, self.foreground_severity, &self.foreground_results);
        }
    }

    /// Trim every background member without a pending one-shot
    pub async fn run_background_sweep(&self) {
        let _gate = self.gate.lock().await;
        self.stats.inc_sweeps();
        let pids: Vec<Pid> = self
            .members_in(TrimTier::Background)
            .into_iter()
            .filter(|pid| !self.first_idle.contains_key(pid))
            .collect();
        debug!(members = pids.len(), "Background sweep");

        for pid in pids {
            let Some(process) = self.resolve_member(pid) else {
                continue;
            };
            let policy = PolicyView::read(self.policy.as_ref(), &process.identity().package);
            if !policy.background_trim_allowed() {
                continue;
            }
            let delivery = self.deliver(&process, self.background_severity, &self.background_results);
            if delivery == Delivery::Delivered && policy.gc_allowed() {
                self.hint_gc(&process);
            }
        }
    }

    /// Stop both sweeps and every pending one-shot
    pub async fn shutdown(&self) {
        let foreground = self.foreground.lock().take();
        let background = self.background.lock().take();
        for task in [foreground, background].into_iter().flatten() {
            task.shutdown().await;
        }
        let pids: Vec<Pid> = self.first_idle.iter().map(|p| *p.key()).collect();
        for pid in pids {
            self.cancel_first_idle(pid);
        }
        info!("Trim scheduler stopped");
    }

    fn schedule_first_idle(self: &Arc<Self>, pid: Pid) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let scheduler = Arc::downgrade(self);
        let delay = self.config.first_idle_delay;
        let package = self
            .registry
            .process(pid)
            .map(|p| p.identity().package.clone())
            .unwrap_or_default();
        let context = TaskContext::new("first_idle_trim").with_process(pid, &package);

        let task = spawn_guarded(&self.runtime, context, async move {
            tokio::time::sleep(delay).await;
            if let Some(scheduler) = scheduler.upgrade() {
                scheduler.run_first_idle(pid, generation).await;
            }
        });
        if let Some(old) = self.first_idle.insert(pid, PendingTrim { generation, task }) {
            old.task.abort();
        }
        debug!(pid, delay_ms = delay.as_millis() as u64, "First-idle trim scheduled");
    }

    async fn run_first_idle(&self, pid: Pid, generation: u64) {
        let _gate = self.gate.lock().await;
        if self
            .first_idle
            .remove_if(&pid, |_, p| p.generation == generation)
            .is_none()
        {
            return;
        }
        if self.tier(pid) != Some(TrimTier::Background) {
            return;
        }
        let Some(process) = self.resolve_member(pid) else {
            return;
        };
        let policy = PolicyView::read(self.policy.as_ref(), &process.identity().package);
        if policy.background_trim_allowed() {
            self.deliver(&process, self.hidden_severity, &self.background_results);
        }
    }

    fn cancel_first_idle(&self, pid: Pid) {
        if let Some((_, pending)) = self.first_idle.remove(&pid) {
            pending.task.abort();
            debug!(pid, "First-idle trim cancelled");
        }
    }

    fn members_in(&self, tier: TrimTier) -> Vec<Pid> {
        self.members
            .iter()
            .filter(|m| *m.value() == tier)
            .map(|m| *m.key())
            .collect()
    }

    /// Look up a member's process, dropping members whose process is gone
    fn resolve_member(&self, pid: Pid) -> Option<Arc<ProcessHandle>> {
        let process = self.registry.process(pid);
        if process.is_none() {
            self.drop_member(pid);
        }
        process
    }

    fn drop_member(&self, pid: Pid) {
        if self.members.remove(&pid).is_some() {
            self.stats.inc_members_dropped();
            debug!(pid, "Unreachable process dropped from trim tiers");
        }
        self.cancel_first_idle(pid);
    }

    fn deliver(&self, process: &ProcessHandle, severity: TrimSeverity, results: &ResultCache) -> Delivery {
        let pid = process.pid();
        let outcome = match self.host.request_trim(pid, severity) {
            Ok(()) => {
                self.stats.inc_trims_delivered();
                debug!(pid, ?severity, "Trim delivered");
                Delivery::Delivered
            }
            Err(e) if e.is_process_gone() => {
                self.stats.inc_trims_failed();
                self.drop_member(pid);
                Delivery::Gone
            }
            Err(e) => {
                self.stats.inc_trims_failed();
                warn!(pid, ?severity, error = %e, "Trim failed");
                Delivery::Failed
            }
        };
        let recorded = match outcome {
            Delivery::Delivered => Outcome::Success,
            Delivery::Failed | Delivery::Gone => Outcome::Problem,
        };
        let now = Instant::now();
        results.update(process, |entry| entry.record(recorded, severity.into(), now));
        outcome
    }

    fn hint_gc(&self, process: &ProcessHandle) {
        let pid = process.pid();
        let outcome = match self.host.request_gc(pid) {
            Ok(()) => {
                self.stats.inc_gc_hints();
                Outcome::Success
            }
            Err(e) => {
                if e.is_process_gone() {
                    self.drop_member(pid);
                } else {
                    warn!(pid, error = %e, "GC hint failed");
                }
                Outcome::Problem
            }
        };
        let now = Instant::now();
        self.gc_results.update(process, |entry| {
            entry.outcome = outcome;
            entry.processed_at = Some(now);
        });
    }
}

impl ProcessCleanup for TrimScheduler {
    fn forget_process(&self, pid: Pid) {
        self.forget(pid);
    }
}
