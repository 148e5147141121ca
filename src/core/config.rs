/*!
 * Kernel Configuration
 *
 * JSON file plus environment overrides. Every field has a default taken from
 * `core::limits`, so an empty object is a valid configuration.
 *
 * Environment variables:
 * - RECLAIM_API_LEVEL: host API level used to select the host profile
 * - RECLAIM_WORKERS: lifecycle worker pool size
 */

use super::errors::ConfigError;
use super::limits;
use crate::memory::types::TrimSeverity;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Throttle windows keyed by (previous level, next level)
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ThrottleWindows {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub partial_partial: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub partial_full: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub full_partial: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub full_full: Duration,
}

impl Default for ThrottleWindows {
    fn default() -> Self {
        Self {
            partial_partial: limits::THROTTLE_PARTIAL_PARTIAL,
            partial_full: limits::THROTTLE_PARTIAL_FULL,
            full_partial: limits::THROTTLE_FULL_PARTIAL,
            full_full: limits::THROTTLE_FULL_FULL,
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct CompactionConfig {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub debounce: Duration,
    pub throttle: ThrottleWindows,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            debounce: limits::COMPACTION_DEBOUNCE,
            throttle: ThrottleWindows::default(),
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct TrimConfig {
    /// Start the foreground sweep with the kernel
    pub foreground_enabled: bool,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub foreground_interval: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub background_interval: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub background_offset: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub first_idle_delay: Duration,
    /// Overrides the host profile's foreground severity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_severity: Option<TrimSeverity>,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            foreground_enabled: true,
            foreground_interval: limits::FOREGROUND_TRIM_INTERVAL,
            background_interval: limits::BACKGROUND_TRIM_INTERVAL,
            background_offset: limits::BACKGROUND_TRIM_OFFSET,
            first_idle_delay: limits::FIRST_IDLE_TRIM_DELAY,
            foreground_severity: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct DispatchConfig {
    /// Lifecycle workers; derived from host parallelism when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
}

impl DispatchConfig {
    /// Resolved worker count, clamped to the supported range
    #[must_use]
    pub fn worker_count(&self) -> usize {
        match self.workers {
            Some(workers) => workers.clamp(1, limits::MAX_LIFECYCLE_WORKERS),
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(limits::MIN_LIFECYCLE_WORKERS)
                .clamp(limits::MIN_LIFECYCLE_WORKERS, limits::MAX_LIFECYCLE_WORKERS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct HostConfig {
    pub api_level: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            api_level: limits::DEFAULT_HOST_API_LEVEL,
        }
    }
}

/// Top-level kernel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct KernelConfig {
    pub compaction: CompactionConfig,
    pub trim: TrimConfig,
    pub dispatch: DispatchConfig,
    pub host: HostConfig,
}

impl KernelConfig {
    /// Parse a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: KernelConfig =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&text)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Apply RECLAIM_* environment overrides
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("RECLAIM_API_LEVEL") {
            self.host.api_level = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("RECLAIM_API_LEVEL={raw}")))?;
        }
        if let Some(raw) = lookup("RECLAIM_WORKERS") {
            let workers: usize = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("RECLAIM_WORKERS={raw}")))?;
            self.dispatch.workers = Some(workers);
        }
        self.validate()?;
        Ok(self)
    }

    /// Reject values that would make a scheduler spin or never fire
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("compaction.debounce", self.compaction.debounce),
            ("trim.foreground_interval", self.trim.foreground_interval),
            ("trim.background_interval", self.trim.background_interval),
            ("trim.first_idle_delay", self.trim.first_idle_delay),
        ];
        for (name, value) in non_zero {
            if value.is_zero() {
                return Err(ConfigError::Invalid(format!("{name} must be non-zero")));
            }
        }
        if self.dispatch.workers == Some(0) {
            return Err(ConfigError::Invalid("dispatch.workers must be non-zero".into()));
        }
        Ok(())
    }
}
