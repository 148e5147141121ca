/*!
 * System Limits and Constants
 *
 * Centralized location for timing windows, pool sizes and defaults.
 * Organized by domain; every value can be overridden through `KernelConfig`
 * unless noted otherwise.
 */

use std::time::Duration;

// =============================================================================
// COMPACTION TIMING
// =============================================================================

/// Delay between a score change and the compaction it triggers.
/// A newer score change for the same process restarts the delay.
pub const COMPACTION_DEBOUNCE: Duration = Duration::from_secs(5);

/// Minimum gap between two partial compactions of one process
pub const THROTTLE_PARTIAL_PARTIAL: Duration = Duration::from_secs(5);

/// Minimum gap between a partial and a following full compaction
pub const THROTTLE_PARTIAL_FULL: Duration = Duration::from_secs(10);

/// Minimum gap between a full and a following partial compaction
pub const THROTTLE_FULL_PARTIAL: Duration = Duration::from_millis(500);

/// Minimum gap between two full compactions of one process
pub const THROTTLE_FULL_FULL: Duration = Duration::from_secs(10);

// =============================================================================
// TRIM TIMING
// =============================================================================

/// Period of the foreground trim sweep
pub const FOREGROUND_TRIM_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Period of the background trim sweep
pub const BACKGROUND_TRIM_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// How long after the first foreground sweep the background sweep starts
pub const BACKGROUND_TRIM_OFFSET: Duration = Duration::from_secs(60);

/// Delay of the one-shot trim fired when a process first goes to background
pub const FIRST_IDLE_TRIM_DELAY: Duration = Duration::from_secs(10);

// =============================================================================
// DISPATCH
// =============================================================================

/// Lower bound for the lifecycle worker pool
pub const MIN_LIFECYCLE_WORKERS: usize = 2;

/// Upper bound for the lifecycle worker pool
pub const MAX_LIFECYCLE_WORKERS: usize = 8;

/// Purged app records kept for reuse (not configurable)
pub const APP_RECORD_POOL_CAPACITY: usize = 64;

// =============================================================================
// HOST
// =============================================================================

/// Host API level assumed when nothing is configured
pub const DEFAULT_HOST_API_LEVEL: u32 = 33;
