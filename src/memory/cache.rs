/*!
 * Result Cache
 *
 * Last outcome, time and level per (process, optimizer). Entries live inside
 * the `ProcessHandle`, so they vanish with it when the process dies.
 */

use super::types::{OptimizerKind, Outcome, ReclaimLevel};
use crate::process::management::ProcessHandle;
use std::time::Duration;
use tokio::time::Instant;

/// What an optimizer last did to a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResultEntry {
    pub outcome: Outcome,
    /// When the optimizer last acted on the process
    pub processed_at: Option<Instant>,
    pub level: ReclaimLevel,
}

impl ResultEntry {
    /// Time since the last processing, if there was one
    #[inline]
    #[must_use]
    pub fn elapsed_since(&self, now: Instant) -> Option<Duration> {
        self.processed_at
            .map(|at| now.saturating_duration_since(at))
    }

    /// Record a finished request
    pub fn record(&mut self, outcome: Outcome, level: ReclaimLevel, at: Instant) {
        self.outcome = outcome;
        self.level = level;
        self.processed_at = Some(at);
    }
}

/// View of the per-process results belonging to one optimizer
#[derive(Debug, Clone, Copy)]
pub struct ResultCache {
    kind: OptimizerKind,
}

impl ResultCache {
    #[inline]
    #[must_use]
    pub const fn new(kind: OptimizerKind) -> Self {
        Self { kind }
    }

    /// Entry for `process`, creating an empty one on first use
    pub fn compute_if_absent(&self, process: &ProcessHandle) -> ResultEntry {
        process.with_results(|results| *results.entry(self.kind).or_default())
    }

    pub fn get(&self, process: &ProcessHandle) -> Option<ResultEntry> {
        process.with_results(|results| results.get(&self.kind).copied())
    }

    /// Mutate the entry for `process` in place
    pub fn update<R, F>(&self, process: &ProcessHandle, mutate: F) -> R
    where
        F: FnOnce(&mut ResultEntry) -> R,
    {
        process.with_results(|results| mutate(results.entry(self.kind).or_default()))
    }
}
