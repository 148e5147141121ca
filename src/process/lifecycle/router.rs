/*!
 * Lifecycle Router
 *
 * Applies surface events to application records under the record lock and
 * fires group hooks on transitions.
 *
 * # Transitions
 *
 * - **SHOWN**: track the surface as current; NONE/IDLE → ACTIVE
 * - **HIDDEN**: when the hidden surface is the current one and the app is not
 *   already IDLE (or the host is not interactive) → IDLE
 * - **DESTROYED**: forget the surface; when none remain → IDLE
 *
 * A non-interactive host re-fires IDLE for an app that is already IDLE, which
 * re-registers its processes with the schedulers.
 */

use crate::host::HostPrimitives;
use crate::monitoring::ReclaimStats;
use crate::policy::{PolicyStore, PolicyView};
use crate::process::core::traits::GroupHooks;
use crate::process::core::types::{
    AppGroup, CreationContext, Identity, SurfaceEvent, SurfaceEventKind, Transition,
};
use crate::process::management::{AppRegistry, AppStateGuard};
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct LifecycleRouter {
    registry: Arc<AppRegistry>,
    host: Arc<dyn HostPrimitives>,
    policy: Arc<dyn PolicyStore>,
    hooks: Arc<dyn GroupHooks>,
    stats: Arc<ReclaimStats>,
}

impl LifecycleRouter {
    pub fn new(
        registry: Arc<AppRegistry>,
        host: Arc<dyn HostPrimitives>,
        policy: Arc<dyn PolicyStore>,
        hooks: Arc<dyn GroupHooks>,
        stats: Arc<ReclaimStats>,
    ) -> Self {
        Self {
            registry,
            host,
            policy,
            hooks,
            stats,
        }
    }

    /// Resolve the creation context for an identity
    ///
    /// `None` when the host cannot resolve the application.
    pub fn creation_context(&self, identity: &Identity) -> Option<CreationContext> {
        let info = self.host.resolve_app(identity)?;
        let policy = PolicyView::read(self.policy.as_ref(), &identity.package);
        Some(CreationContext {
            info,
            manage_mode: policy.manage_mode(&info),
        })
    }

    /// Apply one surface event, returning the transition it caused
    #[instrument(skip(self, event), fields(app = %event.identity, kind = ?event.kind, token = event.token.0))]
    pub fn handle(&self, event: &SurfaceEvent) -> Option<Transition> {
        let Some(context) = self.creation_context(&event.identity) else {
            self.stats.inc_events_dropped();
            debug!("App info lookup failed, event dropped");
            return None;
        };

        let app = self.registry.get_or_create_app(&event.identity, context);
        let _in_flight = app.begin_event();
        let mut state = app.lock();
        if state.group() == AppGroup::Dead {
            debug!("Event for retired app ignored");
            return None;
        }
        state.set_manage_mode(context.manage_mode);
        self.stats.inc_events_handled();

        let transition = match event.kind {
            SurfaceEventKind::Shown => {
                state.show(event.token);
                (state.group() != AppGroup::Active).then(|| {
                    let transition = state.set_group(AppGroup::Active);
                    self.hooks.became_active(&event.identity, &state.pids());
                    transition
                })
            }
            SurfaceEventKind::Hidden => {
                let leave = state.is_current(event.token)
                    && (state.group() != AppGroup::Idle || !self.host.is_globally_interactive());
                leave.then(|| self.enter_idle(&mut state, &event.identity))
            }
            SurfaceEventKind::Destroyed => state
                .destroy(event.token)
                .then(|| self.enter_idle(&mut state, &event.identity)),
        };

        if let Some(transition) = transition {
            self.stats.inc_transitions();
            info!(from = ?transition.from, to = ?transition.to, "Group transition");
        }
        transition
    }

    fn enter_idle(&self, state: &mut AppStateGuard<'_>, identity: &Identity) -> Transition {
        let transition = state.set_group(AppGroup::Idle);
        let managed = state.should_manage();
        self.hooks.became_idle(identity, &state.pids(), managed);
        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Pid;
    use crate::host::RecordingHost;
    use crate::policy::MemoryPolicyStore;
    use crate::process::core::types::SurfaceToken;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Hook {
        Active(Vec<Pid>),
        Idle(Vec<Pid>, bool),
    }

    #[derive(Default)]
    struct HookLog(Mutex<Vec<Hook>>);

    impl GroupHooks for HookLog {
        fn became_active(&self, _identity: &Identity, pids: &[Pid]) {
            self.0.lock().push(Hook::Active(pids.to_vec()));
        }

        fn became_idle(&self, _identity: &Identity, pids: &[Pid], managed: bool) {
            self.0.lock().push(Hook::Idle(pids.to_vec(), managed));
        }
    }

    struct Fixture {
        registry: Arc<AppRegistry>,
        host: Arc<RecordingHost>,
        policy: Arc<MemoryPolicyStore>,
        hooks: Arc<HookLog>,
        router: LifecycleRouter,
        identity: Identity,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(AppRegistry::new());
        let host = Arc::new(RecordingHost::new());
        let policy = Arc::new(MemoryPolicyStore::new());
        let hooks = Arc::new(HookLog::default());
        let router = LifecycleRouter::new(
            Arc::clone(&registry),
            host.clone(),
            policy.clone(),
            hooks.clone(),
            Arc::new(ReclaimStats::new()),
        );
        Fixture {
            registry,
            host,
            policy,
            hooks,
            router,
            identity: Identity::new(0, "com.example"),
        }
    }

    impl Fixture {
        fn event(&self, kind: SurfaceEventKind, token: u64) -> Option<Transition> {
            self.router.handle(&SurfaceEvent {
                kind,
                identity: self.identity.clone(),
                token: SurfaceToken(token),
            })
        }

        fn group(&self) -> AppGroup {
            self.registry.app(&self.identity).map(|a| a.group()).unwrap_or_default()
        }

        fn hooks(&self) -> Vec<Hook> {
            self.hooks.0.lock().clone()
        }
    }

    #[test]
    fn test_shown_activates_once() {
        let f = fixture();
        let t = f.event(SurfaceEventKind::Shown, 1).unwrap();
        assert_eq!((t.from, t.to), (AppGroup::None, AppGroup::Active));
        assert_eq!(f.event(SurfaceEventKind::Shown, 2), None);
        assert_eq!(f.hooks(), vec![Hook::Active(vec![])]);
    }

    #[test]
    fn test_hidden_current_surface_goes_idle() {
        let f = fixture();
        f.registry.get_or_create_process(
            100,
            &f.identity,
            true,
            f.router.creation_context(&f.identity).unwrap(),
        );
        f.event(SurfaceEventKind::Shown, 1);
        let t = f.event(SurfaceEventKind::Hidden, 1).unwrap();
        assert_eq!(t.to, AppGroup::Idle);
        assert_eq!(
            f.hooks(),
            vec![Hook::Active(vec![100]), Hook::Idle(vec![100], true)]
        );
    }

    #[test]
    fn test_hidden_stale_surface_is_ignored() {
        let f = fixture();
        f.event(SurfaceEventKind::Shown, 1);
        f.event(SurfaceEventKind::Shown, 2);
        assert_eq!(f.event(SurfaceEventKind::Hidden, 1), None);
        assert_eq!(f.group(), AppGroup::Active);
    }

    #[test]
    fn test_repeated_hidden_depends_on_interactivity() {
        let f = fixture();
        f.event(SurfaceEventKind::Shown, 1);
        f.event(SurfaceEventKind::Hidden, 1);
        assert_eq!(f.event(SurfaceEventKind::Hidden, 1), None);

        f.host.set_interactive(false);
        let t = f.event(SurfaceEventKind::Hidden, 1).unwrap();
        assert_eq!((t.from, t.to), (AppGroup::Idle, AppGroup::Idle));
    }

    #[test]
    fn test_destroying_last_surface_goes_idle() {
        let f = fixture();
        f.event(SurfaceEventKind::Shown, 1);
        f.event(SurfaceEventKind::Shown, 2);
        assert_eq!(f.event(SurfaceEventKind::Destroyed, 1), None);
        let t = f.event(SurfaceEventKind::Destroyed, 2).unwrap();
        assert_eq!(t.to, AppGroup::Idle);
        assert_eq!(f.hooks().last(), Some(&Hook::Idle(vec![], true)));
    }

    #[test]
    fn test_destroy_after_hide_stays_managed() {
        let f = fixture();
        f.event(SurfaceEventKind::Shown, 1);
        f.event(SurfaceEventKind::Hidden, 1);
        let t = f.event(SurfaceEventKind::Destroyed, 1).unwrap();
        assert_eq!((t.from, t.to), (AppGroup::Idle, AppGroup::Idle));
        assert_eq!(
            f.hooks(),
            vec![
                Hook::Active(vec![]),
                Hook::Idle(vec![], true),
                Hook::Idle(vec![], true)
            ]
        );
    }

    #[test]
    fn test_require_surface_unmanages_surfaceless_app() {
        let f = fixture();
        f.policy.update_toggles(|t| t.require_surface = true);
        f.event(SurfaceEventKind::Shown, 1);
        f.event(SurfaceEventKind::Destroyed, 1);
        assert_eq!(f.hooks().last(), Some(&Hook::Idle(vec![], false)));
    }

    #[test]
    fn test_unknown_token_destroy_is_noop() {
        let f = fixture();
        assert_eq!(f.event(SurfaceEventKind::Destroyed, 9), None);
        assert_eq!(f.group(), AppGroup::None);
    }

    #[test]
    fn test_unresolvable_app_is_dropped() {
        let f = fixture();
        f.host.set_unresolvable(f.identity.clone());
        assert_eq!(f.event(SurfaceEventKind::Shown, 1), None);
        assert!(f.registry.app(&f.identity).is_none());
    }

    #[test]
    fn test_in_flight_released_after_event() {
        let f = fixture();
        f.event(SurfaceEventKind::Shown, 1);
        assert_eq!(f.registry.app(&f.identity).unwrap().in_flight(), 0);
    }
}
