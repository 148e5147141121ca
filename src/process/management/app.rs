/*!
 * Application Records
 *
 * Per-application lifecycle state. The group is mirrored into an atomic so
 * schedulers can read it without taking the record lock; every write happens
 * under the lock through `AppStateGuard`.
 */

use crate::core::types::Pid;
use crate::process::core::types::{
    AppGroup, AppInfo, CreationContext, Identity, ManageMode, SurfaceToken, Transition,
};
use ahash::AHashSet;
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

/// Mutable state protected by the record lock
#[derive(Debug)]
struct AppState {
    group: AppGroup,
    surfaces: AHashSet<SurfaceToken>,
    current: Option<SurfaceToken>,
    pids: BTreeSet<Pid>,
    manage_mode: ManageMode,
}

impl AppState {
    fn new(manage_mode: ManageMode) -> Self {
        Self {
            group: AppGroup::None,
            surfaces: AHashSet::new(),
            current: None,
            pids: BTreeSet::new(),
            manage_mode,
        }
    }

    fn should_manage(&self) -> bool {
        match self.manage_mode {
            ManageMode::Always => true,
            ManageMode::Never => false,
            ManageMode::WithSurface => !self.surfaces.is_empty(),
        }
    }
}

/// Lifecycle record for one application identity
#[derive(Debug)]
pub struct AppRecord {
    identity: Identity,
    info: AppInfo,
    group: AtomicU8,
    in_flight: AtomicUsize,
    state: Mutex<AppState>,
}

impl AppRecord {
    pub fn new(identity: Identity, context: CreationContext) -> Self {
        Self {
            identity,
            info: context.info,
            group: AtomicU8::new(AppGroup::None as u8),
            in_flight: AtomicUsize::new(0),
            state: Mutex::new(AppState::new(context.manage_mode)),
        }
    }

    /// Re-initialize a recycled record for a new identity
    pub(crate) fn reset(&mut self, identity: Identity, context: CreationContext) {
        self.identity = identity;
        self.info = context.info;
        *self.group.get_mut() = AppGroup::None as u8;
        *self.in_flight.get_mut() = 0;
        *self.state.get_mut() = AppState::new(context.manage_mode);
    }

    #[inline]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[inline]
    pub fn info(&self) -> AppInfo {
        self.info
    }

    /// Lock-free read of the group; may lag a transition in progress
    #[inline]
    pub fn group(&self) -> AppGroup {
        AppGroup::from_u8(self.group.load(Ordering::Acquire))
    }

    /// Number of events currently being handled for this application
    #[inline]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Mark an event as in flight until the returned guard drops
    pub fn begin_event(&self) -> InFlightGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            counter: &self.in_flight,
        }
    }

    /// Take the record's exclusive lock
    pub fn lock(&self) -> AppStateGuard<'_> {
        AppStateGuard {
            group: &self.group,
            state: self.state.lock(),
        }
    }

    pub fn should_manage(&self) -> bool {
        self.state.lock().should_manage()
    }

    pub fn manage_mode(&self) -> ManageMode {
        self.state.lock().manage_mode
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.state.lock().pids.iter().copied().collect()
    }

    pub fn process_count(&self) -> usize {
        self.state.lock().pids.len()
    }

    pub fn surface_count(&self) -> usize {
        self.state.lock().surfaces.len()
    }

    /// Add a process; fails once the record has been retired
    pub(crate) fn attach(&self, pid: Pid) -> bool {
        let mut state = self.state.lock();
        if state.group == AppGroup::Dead {
            return false;
        }
        state.pids.insert(pid);
        true
    }

    /// Remove a process, returning how many remain
    pub(crate) fn detach(&self, pid: Pid) -> usize {
        let mut state = self.state.lock();
        state.pids.remove(&pid);
        state.pids.len()
    }

    /// Mark DEAD if no process is attached
    pub(crate) fn try_retire(&self) -> bool {
        let mut guard = self.lock();
        if !guard.state.pids.is_empty() || guard.state.group == AppGroup::Dead {
            return false;
        }
        guard.set_group(AppGroup::Dead);
        true
    }

    /// Mark DEAD unconditionally and hand back the attached processes
    pub(crate) fn retire(&self) -> Vec<Pid> {
        let mut guard = self.lock();
        guard.set_group(AppGroup::Dead);
        std::mem::take(&mut guard.state.pids).into_iter().collect()
    }
}

/// Decrements the in-flight counter on drop
pub struct InFlightGuard<'a> {
    counter: &'a AtomicUsize,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Exclusive access to an application's state
pub struct AppStateGuard<'a> {
    group: &'a AtomicU8,
    state: MutexGuard<'a, AppState>,
}

impl AppStateGuard<'_> {
    #[inline]
    pub fn group(&self) -> AppGroup {
        self.state.group
    }

    /// Move to `to`, publishing the new group to lock-free readers
    pub fn set_group(&mut self, to: AppGroup) -> Transition {
        let from = self.state.group;
        self.state.group = to;
        self.group.store(to as u8, Ordering::Release);
        Transition { from, to }
    }

    #[inline]
    pub fn manage_mode(&self) -> ManageMode {
        self.state.manage_mode
    }

    pub fn set_manage_mode(&mut self, mode: ManageMode) {
        self.state.manage_mode = mode;
    }

    pub fn should_manage(&self) -> bool {
        self.state.should_manage()
    }

    /// Track `token` as the current foreground surface
    pub fn show(&mut self, token: SurfaceToken) {
        self.state.surfaces.insert(token);
        self.state.current = Some(token);
    }

    #[inline]
    pub fn is_current(&self, token: SurfaceToken) -> bool {
        self.state.current == Some(token)
    }

    /// Forget `token`; true when this emptied the surface set
    pub fn destroy(&mut self, token: SurfaceToken) -> bool {
        if self.state.current == Some(token) {
            self.state.current = None;
        }
        self.state.surfaces.remove(&token) && self.state.surfaces.is_empty()
    }

    pub fn surface_count(&self) -> usize {
        self.state.surfaces.len()
    }

    pub fn pids(&self) -> Vec<Pid> {
        self.state.pids.iter().copied().collect()
    }
}
