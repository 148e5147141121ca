/*!
 * Host Profiles
 *
 * Hosts expose different priority-score scales and trim levels depending on
 * their API level. Instead of one shim per version, the differences live in a
 * single table that is resolved once when the kernel is built.
 */

use crate::core::types::Score;
use crate::memory::types::TrimSeverity;
use serde::{Deserialize, Serialize};

/// Named priority-score bands used by the compaction decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScoreBands {
    pub perceptible_min: Score,
    pub perceptible_max: Score,
    /// Highest score still considered a service process
    pub service: Score,
    pub cached_min: Score,
    pub cached_max: Score,
}

impl ScoreBands {
    /// Whether the closed range spanned by `a` and `b` touches the perceptible band
    #[inline]
    #[must_use]
    pub fn spans_perceptible(&self, a: Score, b: Score) -> bool {
        overlaps(a, b, self.perceptible_min, self.perceptible_max)
    }

    /// Whether the closed range spanned by `a` and `b` touches the cached band
    #[inline]
    #[must_use]
    pub fn spans_cached(&self, a: Score, b: Score) -> bool {
        overlaps(a, b, self.cached_min, self.cached_max)
    }

    #[inline]
    #[must_use]
    pub const fn within_service(&self, score: Score) -> bool {
        score <= self.service
    }
}

#[inline]
fn overlaps(a: Score, b: Score, lo: Score, hi: Score) -> bool {
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    start <= hi && end >= lo
}

/// Host capabilities that vary with API level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HostProfile {
    pub name: &'static str,
    pub bands: ScoreBands,
    pub foreground_trim: TrimSeverity,
    pub background_trim: TrimSeverity,
    pub hidden_trim: TrimSeverity,
}

/// Coarse 0..=15 score scale
const LEGACY: HostProfile = HostProfile {
    name: "legacy",
    bands: ScoreBands {
        perceptible_min: 2,
        perceptible_max: 2,
        service: 5,
        cached_min: 9,
        cached_max: 15,
    },
    foreground_trim: TrimSeverity::RunningModerate,
    background_trim: TrimSeverity::Background,
    hidden_trim: TrimSeverity::UiHidden,
};

/// Fine 0..=999 score scale with a single perceptible value
const STANDARD: HostProfile = HostProfile {
    name: "standard",
    bands: ScoreBands {
        perceptible_min: 200,
        perceptible_max: 200,
        service: 500,
        cached_min: 900,
        cached_max: 906,
    },
    foreground_trim: TrimSeverity::RunningModerate,
    background_trim: TrimSeverity::Background,
    hidden_trim: TrimSeverity::UiHidden,
};

/// Fine scale with a widened perceptible band and full cached range
const EXTENDED: HostProfile = HostProfile {
    name: "extended",
    bands: ScoreBands {
        perceptible_min: 200,
        perceptible_max: 250,
        service: 500,
        cached_min: 900,
        cached_max: 999,
    },
    foreground_trim: TrimSeverity::RunningModerate,
    background_trim: TrimSeverity::Background,
    hidden_trim: TrimSeverity::UiHidden,
};

/// (minimum API level, profile), ascending
const PROFILE_TABLE: &[(u32, HostProfile)] = &[(0, LEGACY), (24, STANDARD), (29, EXTENDED)];

impl HostProfile {
    /// Resolve the profile for a host API level
    #[must_use]
    pub fn for_api_level(api_level: u32) -> HostProfile {
        PROFILE_TABLE
            .iter()
            .rev()
            .find(|(min_level, _)| api_level >= *min_level)
            .map(|(_, profile)| *profile)
            .unwrap_or(LEGACY)
    }
}
