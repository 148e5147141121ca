/*!
 * Kernel
 *
 * Facade wiring the registry, router, dispatcher and both schedulers
 * together. Surface and process events go through the dispatcher so they
 * are handled in per-application order; score changes are evaluated on the
 * caller's thread.
 */

use super::events::HostEventSink;
use super::snapshot::{AppSnapshot, ProcessSnapshot};
use crate::core::config::KernelConfig;
use crate::core::errors::KernelError;
use crate::core::types::{KernelResult, Pid, Score};
use crate::host::{HostPrimitives, HostProfile};
use crate::memory::{CompactionScheduler, ReclaimHooks, TrimScheduler};
use crate::monitoring::{generate_run_id, ReclaimStats, ReclaimStatsSnapshot};
use crate::policy::{MemoryPolicyStore, PolicyStore, PolicyView};
use crate::process::core::traits::{GroupHooks, LifecycleHandler, ProcessCleanup};
use crate::process::core::types::{
    AppGroup, Identity, LifecycleEvent, SurfaceEvent, SurfaceEventKind, SurfaceToken,
};
use crate::process::lifecycle::{EventDispatcher, LifecycleRouter};
use crate::process::management::{AppRegistry, ProcessHandle};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

/// Builder for [`Kernel`]
pub struct KernelBuilder {
    config: KernelConfig,
    host: Option<Arc<dyn HostPrimitives>>,
    policy: Option<Arc<dyn PolicyStore>>,
    runtime: Option<Handle>,
}

impl KernelBuilder {
    pub fn new() -> Self {
        Self {
            config: KernelConfig::default(),
            host: None,
            policy: None,
            runtime: None,
        }
    }

    pub fn with_config(mut self, config: KernelConfig) -> Self {
        self.config = config;
        self
    }

    /// Host adapter (required)
    pub fn with_host(mut self, host: Arc<dyn HostPrimitives>) -> Self {
        self.host = Some(host);
        self
    }

    /// Policy store; an empty in-memory store is used when unset
    pub fn with_policy(mut self, policy: Arc<dyn PolicyStore>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Runtime for workers and timers; the current runtime when unset
    pub fn with_runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> KernelResult<Kernel> {
        self.config.validate()?;
        let host = self.host.ok_or(KernelError::MissingComponent("host"))?;
        let policy: Arc<dyn PolicyStore> = match self.policy {
            Some(policy) => policy,
            None => Arc::new(MemoryPolicyStore::new()),
        };
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|e| KernelError::Runtime(e.to_string()))?,
        };

        let config = self.config;
        let profile = HostProfile::for_api_level(config.host.api_level);
        let stats = Arc::new(ReclaimStats::new());
        let registry = Arc::new(AppRegistry::new());

        let compaction = Arc::new(CompactionScheduler::new(
            runtime.clone(),
            Arc::clone(&registry),
            Arc::clone(&host),
            Arc::clone(&policy),
            Arc::clone(&stats),
            &profile,
            config.compaction,
        ));
        let trim = Arc::new(TrimScheduler::new(
            runtime.clone(),
            Arc::clone(&registry),
            Arc::clone(&host),
            Arc::clone(&policy),
            Arc::clone(&stats),
            &profile,
            config.trim,
        ));

        let compaction_cleanup: Arc<dyn ProcessCleanup> = compaction.clone();
        let trim_cleanup: Arc<dyn ProcessCleanup> = trim.clone();
        registry.register_cleanup(&compaction_cleanup);
        registry.register_cleanup(&trim_cleanup);

        let hooks: Arc<dyn GroupHooks> = Arc::new(ReclaimHooks::new(
            Arc::clone(&compaction),
            Arc::clone(&trim),
        ));
        let router = LifecycleRouter::new(
            Arc::clone(&registry),
            Arc::clone(&host),
            Arc::clone(&policy),
            Arc::clone(&hooks),
            Arc::clone(&stats),
        );

        let core = Arc::new(KernelCore {
            registry,
            router,
            hooks,
            compaction,
            trim,
            policy,
            stats,
            announced: DashMap::new(),
        });
        let dispatcher = EventDispatcher::spawn(
            &runtime,
            config.dispatch.worker_count(),
            core.clone(),
        );
        core.trim.start();

        let run_id = generate_run_id();
        info!(
            run_id = %run_id,
            profile = profile.name,
            api_level = config.host.api_level,
            workers = dispatcher.worker_count(),
            "Reclaim kernel started"
        );

        Ok(Kernel {
            core,
            dispatcher,
            config,
            profile,
            run_id,
        })
    }
}

impl Default for KernelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared with the lifecycle workers
struct KernelCore {
    registry: Arc<AppRegistry>,
    router: LifecycleRouter,
    hooks: Arc<dyn GroupHooks>,
    compaction: Arc<CompactionScheduler>,
    trim: Arc<TrimScheduler>,
    policy: Arc<dyn PolicyStore>,
    stats: Arc<ReclaimStats>,
    /// Pids reported by the host, so deaths can be routed to the right queue
    announced: DashMap<Pid, Identity>,
}

impl KernelCore {
    fn process_created(&self, pid: Pid, identity: &Identity, is_main: bool) {
        let Some(context) = self.router.creation_context(identity) else {
            self.stats.inc_events_dropped();
            debug!(pid, app = %identity, "App info lookup failed, process ignored");
            return;
        };
        self.registry
            .get_or_create_process(pid, identity, is_main, context);
        self.stats.inc_events_handled();

        let Some(app) = self.registry.app(identity) else {
            return;
        };
        match app.group() {
            AppGroup::Active => self.hooks.became_active(identity, &[pid]),
            AppGroup::Idle => self
                .hooks
                .became_idle(identity, &[pid], app.should_manage()),
            AppGroup::None | AppGroup::Dead => {}
        }
        debug!(pid, app = %identity, is_main, "Process tracked");
    }

    fn process_died(&self, pid: Pid, identity: &Identity) {
        self.stats.inc_events_handled();
        if self.registry.remove_process(pid).is_none() {
            debug!(pid, app = %identity, "Process already gone");
        }
    }

    fn app_removed(&self, identity: &Identity) {
        self.stats.inc_events_handled();
        let pids = self
            .registry
            .app(identity)
            .map(|app| app.pids())
            .unwrap_or_default();
        if !self.registry.remove_app(identity) {
            debug!(app = %identity, "Removal of unknown app ignored");
            return;
        }
        for pid in pids {
            self.announced.remove_if(&pid, |_, owner| owner == identity);
        }
    }
}

impl LifecycleHandler for KernelCore {
    fn handle(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Surface(event) => {
                self.router.handle(&event);
            }
            LifecycleEvent::ProcessCreated {
                pid,
                identity,
                is_main,
            } => self.process_created(pid, &identity, is_main),
            LifecycleEvent::ProcessDied { pid, identity } => self.process_died(pid, &identity),
            LifecycleEvent::AppRemoved { identity } => self.app_removed(&identity),
        }
    }
}

/// Application lifecycle and reclamation kernel
pub struct Kernel {
    core: Arc<KernelCore>,
    dispatcher: EventDispatcher,
    config: KernelConfig,
    profile: HostProfile,
    run_id: String,
}

impl Kernel {
    pub fn builder() -> KernelBuilder {
        KernelBuilder::new()
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn profile(&self) -> &HostProfile {
        &self.profile
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn compaction(&self) -> &CompactionScheduler {
        &self.core.compaction
    }

    pub fn trim(&self) -> &TrimScheduler {
        &self.core.trim
    }

    pub fn stats(&self) -> ReclaimStatsSnapshot {
        self.core.stats.snapshot()
    }

    pub fn app(&self, identity: &Identity) -> Option<AppSnapshot> {
        self.core
            .registry
            .app(identity)
            .map(|app| AppSnapshot::capture(&app))
    }

    pub fn apps(&self) -> Vec<AppSnapshot> {
        let mut apps: Vec<AppSnapshot> = self
            .core
            .registry
            .apps()
            .iter()
            .map(|app| AppSnapshot::capture(app))
            .collect();
        apps.sort_by(|a, b| a.identity.cmp(&b.identity));
        apps
    }

    pub fn process(&self, pid: Pid) -> Option<ProcessSnapshot> {
        self.core
            .registry
            .process(pid)
            .map(|process| self.capture_process(&process))
    }

    pub fn processes(&self) -> Vec<ProcessSnapshot> {
        let mut processes: Vec<ProcessSnapshot> = self
            .core
            .registry
            .processes()
            .iter()
            .map(|process| self.capture_process(process))
            .collect();
        processes.sort_by_key(|p| p.pid);
        processes
    }

    /// Turn the foreground trim sweep on or off
    pub fn set_foreground_trim_enabled(&self, enabled: bool) {
        self.core.trim.set_foreground_enabled(enabled);
    }

    /// Remove an application and all of its processes
    ///
    /// The removal is queued behind every event already delivered for the
    /// application; `flush` waits for it.
    pub fn remove_app(&self, identity: &Identity) {
        self.submit(LifecycleEvent::AppRemoved {
            identity: identity.clone(),
        });
    }

    /// Wait until every event delivered so far has been handled
    pub async fn flush(&self) {
        self.dispatcher.flush().await;
    }

    /// Drain pending events and stop every background task
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
        self.core.trim.shutdown().await;
        self.core.compaction.shutdown();
        info!(run_id = %self.run_id, "Reclaim kernel stopped");
    }

    fn capture_process(&self, process: &ProcessHandle) -> ProcessSnapshot {
        let pid = process.pid();
        ProcessSnapshot::capture(
            process,
            self.core.trim.tier(pid),
            self.core.compaction.pending_level(pid),
        )
    }

    fn submit(&self, event: LifecycleEvent) {
        if !self.dispatcher.submit(event) {
            warn!("Lifecycle dispatcher stopped, event dropped");
            self.core.stats.inc_events_dropped();
        }
    }
}

impl HostEventSink for Kernel {
    fn on_surface_event(&self, kind: SurfaceEventKind, identity: Identity, token: SurfaceToken) {
        self.submit(LifecycleEvent::Surface(SurfaceEvent {
            kind,
            identity,
            token,
        }));
    }

    fn on_process_created(&self, pid: Pid, identity: Identity, is_main: bool) {
        self.core.announced.insert(pid, identity.clone());
        self.submit(LifecycleEvent::ProcessCreated {
            pid,
            identity,
            is_main,
        });
    }

    fn on_process_died(&self, pid: Pid) {
        match self.core.announced.remove(&pid) {
            Some((pid, identity)) => self.submit(LifecycleEvent::ProcessDied { pid, identity }),
            None => debug!(pid, "Death of unknown process ignored"),
        }
    }

    fn on_score_changed(&self, pid: Pid, previous: Score, current: Score) -> Option<Score> {
        let Some(process) = self.core.registry.process(pid) else {
            debug!(pid, "Score change for unknown process ignored");
            return None;
        };

        let override_score = if process.is_main() {
            PolicyView::read(self.core.policy.as_ref(), &process.identity().package)
                .custom_main_score()
        } else {
            None
        };
        let effective = override_score.unwrap_or(current);
        process.record_score(previous, effective);

        if let Some(level) = self.core.compaction.on_score_changed(&process, previous, effective) {
            debug!(pid, previous, current = effective, %level, "Score change scheduled compaction");
        }
        override_score
    }
}
