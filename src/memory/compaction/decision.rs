/*!
 * Compaction Decision
 *
 * Pure function from a score change and the last recorded result to an
 * optional compaction level. First matching rule wins:
 *
 * 1. Unchanged score → nothing
 * 2. Range touches the perceptible band and the new score is within the
 *    service band → PARTIAL, unless throttled
 * 3. Range touches the cached band, or the host says the process is stale
 *    → FULL, unless throttled
 * 4. Otherwise nothing
 */

use crate::core::config::ThrottleWindows;
use crate::core::types::Score;
use crate::host::profile::ScoreBands;
use crate::memory::cache::ResultEntry;
use crate::memory::types::{CompactLevel, ReclaimLevel};
use std::time::Duration;
use tokio::time::Instant;

/// Score transition reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreChange {
    pub previous: Score,
    pub current: Score,
}

impl ScoreChange {
    #[inline]
    #[must_use]
    pub const fn new(previous: Score, current: Score) -> Self {
        Self { previous, current }
    }
}

/// Evaluates score changes against one host profile and throttle table
#[derive(Debug, Clone, Copy)]
pub struct Decider {
    bands: ScoreBands,
    throttle: ThrottleWindows,
}

impl Decider {
    #[must_use]
    pub const fn new(bands: ScoreBands, throttle: ThrottleWindows) -> Self {
        Self { bands, throttle }
    }

    /// Level to request for `change`, or `None` when nothing should happen
    ///
    /// `allowed_now` is only consulted when the band rules alone do not
    /// select a level.
    pub fn decide<F>(
        &self,
        change: ScoreChange,
        last: &ResultEntry,
        now: Instant,
        allowed_now: F,
    ) -> Option<CompactLevel>
    where
        F: FnOnce() -> bool,
    {
        let ScoreChange { previous, current } = change;
        if previous == current {
            return None;
        }

        if self.bands.spans_perceptible(previous, current) && self.bands.within_service(current) {
            return self.unless_throttled(CompactLevel::Partial, last, now);
        }

        if self.bands.spans_cached(previous, current) || allowed_now() {
            return self.unless_throttled(CompactLevel::Full, last, now);
        }

        None
    }

    fn unless_throttled(
        &self,
        next: CompactLevel,
        last: &ResultEntry,
        now: Instant,
    ) -> Option<CompactLevel> {
        let Some(window) = self.window(last.level, next) else {
            return Some(next);
        };
        match last.elapsed_since(now) {
            Some(elapsed) if elapsed < window => None,
            _ => Some(next),
        }
    }

    /// Throttle window between the last level and `next`
    fn window(&self, last: ReclaimLevel, next: CompactLevel) -> Option<Duration> {
        let t = &self.throttle;
        match (last, next) {
            (ReclaimLevel::Partial, CompactLevel::Partial) => Some(t.partial_partial),
            (ReclaimLevel::Partial, CompactLevel::Full) => Some(t.partial_full),
            (ReclaimLevel::Full, CompactLevel::Partial) => Some(t.full_partial),
            (ReclaimLevel::Full, CompactLevel::Full) => Some(t.full_full),
            _ => None,
        }
    }
}
