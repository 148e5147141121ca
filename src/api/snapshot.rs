/*!
 * Snapshots
 * Serializable views of applications and processes for a control surface
 */

use crate::core::types::{Pid, Score};
use crate::memory::cache::ResultEntry;
use crate::memory::types::{CompactLevel, OptimizerKind, Outcome, ReclaimLevel};
use crate::memory::TrimTier;
use crate::process::core::types::{AppGroup, Identity, ManageMode};
use crate::process::management::{AppRecord, ProcessHandle};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppSnapshot {
    pub identity: Identity,
    pub group: AppGroup,
    pub manage_mode: ManageMode,
    pub managed: bool,
    pub surfaces: usize,
    pub in_flight: usize,
    pub processes: Vec<Pid>,
}

impl AppSnapshot {
    pub fn capture(app: &AppRecord) -> Self {
        let state = app.lock();
        Self {
            identity: app.identity().clone(),
            group: state.group(),
            manage_mode: state.manage_mode(),
            managed: state.should_manage(),
            surfaces: state.surface_count(),
            in_flight: app.in_flight(),
            processes: state.pids(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResultSnapshot {
    pub optimizer: OptimizerKind,
    pub outcome: Outcome,
    pub level: ReclaimLevel,
    /// Milliseconds since the optimizer last processed the process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_ms: Option<u64>,
}

impl ResultSnapshot {
    fn capture(optimizer: OptimizerKind, entry: &ResultEntry, now: Instant) -> Self {
        Self {
            optimizer,
            outcome: entry.outcome,
            level: entry.level,
            age_ms: entry.elapsed_since(now).map(|age| age.as_millis() as u64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProcessSnapshot {
    pub pid: Pid,
    pub identity: Identity,
    pub is_main: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_score: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_score: Option<Score>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trim_tier: Option<TrimTier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_compaction: Option<CompactLevel>,
    pub results: Vec<ResultSnapshot>,
}

impl ProcessSnapshot {
    pub fn capture(
        process: &ProcessHandle,
        trim_tier: Option<TrimTier>,
        pending_compaction: Option<CompactLevel>,
    ) -> Self {
        let now = Instant::now();
        let mut results: Vec<ResultSnapshot> = process
            .results()
            .iter()
            .map(|(kind, entry)| ResultSnapshot::capture(*kind, entry, now))
            .collect();
        results.sort_by_key(|r| r.optimizer as u8);

        Self {
            pid: process.pid(),
            identity: process.identity().clone(),
            is_main: process.is_main(),
            last_score: process.last_score(),
            current_score: process.current_score(),
            trim_tier,
            pending_compaction,
            results,
        }
    }
}
