/*!
 * Reclamation Types
 * Levels, severities and outcome codes shared by both optimizers
 */

use serde::{Deserialize, Serialize};
use std::fmt;

/// Compaction intensity requested from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactLevel {
    /// Reclaim file-backed pages only
    Partial,
    /// Reclaim everything the host is able to
    Full,
}

impl fmt::Display for CompactLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompactLevel::Partial => write!(f, "partial"),
            CompactLevel::Full => write!(f, "full"),
        }
    }
}

/// Trim notification severity, ordered from mildest to harshest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrimSeverity {
    RunningModerate,
    RunningLow,
    RunningCritical,
    UiHidden,
    Background,
    Moderate,
    Complete,
}

impl TrimSeverity {
    /// Numeric level understood by host trim callbacks
    #[inline]
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            TrimSeverity::RunningModerate => 5,
            TrimSeverity::RunningLow => 10,
            TrimSeverity::RunningCritical => 15,
            TrimSeverity::UiHidden => 20,
            TrimSeverity::Background => 40,
            TrimSeverity::Moderate => 60,
            TrimSeverity::Complete => 80,
        }
    }
}

/// Which optimizer a cached result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Compaction,
    ForegroundTrim,
    BackgroundTrim,
    GcHint,
}

/// Last outcome recorded for a (process, optimizer) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Problem,
    /// Policy disallowed the request
    #[default]
    DoNothing,
    /// The process stopped being eligible before the request ran
    Unnecessary,
}

/// Level recorded with the last processing of a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ReclaimLevel {
    #[default]
    None,
    Partial,
    Full,
    Trim(TrimSeverity),
}

impl From<CompactLevel> for ReclaimLevel {
    fn from(level: CompactLevel) -> Self {
        match level {
            CompactLevel::Partial => ReclaimLevel::Partial,
            CompactLevel::Full => ReclaimLevel::Full,
        }
    }
}

impl From<TrimSeverity> for ReclaimLevel {
    fn from(severity: TrimSeverity) -> Self {
        ReclaimLevel::Trim(severity)
    }
}
