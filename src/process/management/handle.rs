/*!
 * Process Handles
 * Per-process scores and optimizer results, keyed back to the owning app by identity
 */

use crate::core::types::{Pid, Score};
use crate::memory::cache::ResultEntry;
use crate::memory::types::OptimizerKind;
use crate::process::core::types::Identity;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

/// Sentinel for "no score reported yet"
const UNSET_SCORE: Score = Score::MIN;

/// Live process tracked by the registry
#[derive(Debug)]
pub struct ProcessHandle {
    pid: Pid,
    identity: Identity,
    is_main: bool,
    last_score: AtomicI32,
    current_score: AtomicI32,
    results: Mutex<AHashMap<OptimizerKind, ResultEntry>>,
}

impl ProcessHandle {
    pub fn new(pid: Pid, identity: Identity, is_main: bool) -> Self {
        Self {
            pid,
            identity,
            is_main,
            last_score: AtomicI32::new(UNSET_SCORE),
            current_score: AtomicI32::new(UNSET_SCORE),
            results: Mutex::new(AHashMap::new()),
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Identity of the owning application
    #[inline]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[inline]
    pub fn is_main(&self) -> bool {
        self.is_main
    }

    pub fn last_score(&self) -> Option<Score> {
        score(self.last_score.load(Ordering::Acquire))
    }

    pub fn current_score(&self) -> Option<Score> {
        score(self.current_score.load(Ordering::Acquire))
    }

    /// Record a host score change
    pub fn record_score(&self, previous: Score, current: Score) {
        self.last_score.store(previous, Ordering::Release);
        self.current_score.store(current, Ordering::Release);
    }

    /// Run `f` with exclusive access to this process's optimizer results
    pub(crate) fn with_results<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&mut AHashMap<OptimizerKind, ResultEntry>) -> R,
    {
        f(&mut self.results.lock())
    }

    /// Copy of every recorded result
    pub fn results(&self) -> Vec<(OptimizerKind, ResultEntry)> {
        self.results
            .lock()
            .iter()
            .map(|(kind, entry)| (*kind, *entry))
            .collect()
    }
}

#[inline]
fn score(raw: Score) -> Option<Score> {
    (raw != UNSET_SCORE).then_some(raw)
}
