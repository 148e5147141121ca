/*!
 * Trim Tests
 * Periodic sweeps and the first-idle one-shot driven by real group changes
 */

use crate::support::{app, harness, harness_with, Harness};
use pretty_assertions::assert_eq;
use reclaim_kernel::{AppPolicy, HostError, KernelConfig, TrimSeverity, TrimTier};
use std::time::Duration;
use tokio::time::sleep;

fn secs(n: u64) -> Duration {
    Duration::from_secs(n)
}

async fn foreground_process(h: &Harness, pid: u32, package: &str) {
    let id = app(package);
    h.spawn(pid, &id, true).await;
    h.show(&id, 1).await;
}

async fn background_process(h: &Harness, pid: u32, package: &str) {
    let id = app(package);
    h.spawn(pid, &id, true).await;
    h.show(&id, 1).await;
    h.hide(&id, 1).await;
}

#[tokio::test(start_paused = true)]
async fn test_foreground_sweep_after_interval() {
    let h = harness();
    foreground_process(&h, 1, "com.example.fg").await;

    sleep(secs(599)).await;
    assert!(h.host.trims().is_empty());
    sleep(secs(2)).await;
    assert_eq!(h.host.trims(), vec![(1, TrimSeverity::RunningModerate)]);
}

#[tokio::test(start_paused = true)]
async fn test_foreground_sweep_disabled_by_config() {
    let mut config = KernelConfig::default();
    config.trim.foreground_enabled = false;
    let h = harness_with(config);
    foreground_process(&h, 2, "com.example.off").await;

    sleep(secs(601)).await;
    assert!(h.host.trims().is_empty());
    assert!(!h.kernel.trim().is_foreground_enabled());

    h.kernel.set_foreground_trim_enabled(true);
    assert!(h.kernel.trim().is_foreground_enabled());
    sleep(secs(601)).await;
    assert_eq!(h.host.trims(), vec![(2, TrimSeverity::RunningModerate)]);
}

#[tokio::test(start_paused = true)]
async fn test_first_idle_then_background_sweep() {
    let h = harness();
    background_process(&h, 3, "com.example.bg").await;
    assert!(h.kernel.trim().has_pending_first_idle(3));

    sleep(secs(11)).await;
    assert_eq!(h.host.trims(), vec![(3, TrimSeverity::UiHidden)]);
    assert!(!h.kernel.trim().has_pending_first_idle(3));

    sleep(secs(650)).await;
    assert_eq!(
        h.host.trims(),
        vec![(3, TrimSeverity::UiHidden), (3, TrimSeverity::Background)]
    );
    assert!(h.host.gc_hints().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_returning_to_foreground_cancels_first_idle() {
    let h = harness();
    let id = app("com.example.flip");
    h.spawn(4, &id, true).await;
    h.show(&id, 1).await;
    h.hide(&id, 1).await;

    sleep(secs(5)).await;
    h.show(&id, 2).await;
    assert_eq!(h.kernel.trim().tier(4), Some(TrimTier::Foreground));
    assert!(!h.kernel.trim().has_pending_first_idle(4));

    sleep(secs(10)).await;
    assert!(h.host.trims().is_empty());

    // only the first background entry arms the one-shot
    h.hide(&id, 2).await;
    assert_eq!(h.kernel.trim().tier(4), Some(TrimTier::Background));
    assert!(!h.kernel.trim().has_pending_first_idle(4));
}

#[tokio::test(start_paused = true)]
async fn test_gc_hint_follows_background_trim() {
    let h = harness();
    h.policy.update_toggles(|t| t.background_gc = true);
    background_process(&h, 5, "com.example.gc").await;

    sleep(secs(661)).await;
    assert_eq!(h.host.gc_hints(), vec![5]);
    assert_eq!(h.kernel.stats().gc_hints, 1);
}

#[tokio::test(start_paused = true)]
async fn test_per_app_policy_blocks_background_trim() {
    let h = harness();
    h.policy.set_app_policy(
        "com.example.quiet",
        AppPolicy {
            enable_background_trim: Some(false),
            ..AppPolicy::default()
        },
    );
    background_process(&h, 6, "com.example.quiet").await;
    background_process(&h, 7, "com.example.loud").await;

    sleep(secs(661)).await;
    assert_eq!(
        h.host.trims(),
        vec![(7, TrimSeverity::UiHidden), (7, TrimSeverity::Background)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_vanished_process_dropped_from_tier() {
    let h = harness();
    foreground_process(&h, 8, "com.example.ghost").await;
    h.host.fail_trim(8, HostError::ProcessGone(8));

    sleep(secs(601)).await;
    assert_eq!(h.kernel.trim().tier(8), None);
    assert_eq!(h.kernel.stats().members_dropped, 1);
}

#[tokio::test(start_paused = true)]
async fn test_trigger_skips_pending_one_shot() {
    let h = harness();
    background_process(&h, 9, "com.example.now").await;

    h.kernel.trim().trigger_background();
    sleep(Duration::from_millis(10)).await;
    assert!(h.host.trims().is_empty());

    sleep(secs(11)).await;
    h.kernel.trim().trigger_background();
    sleep(Duration::from_millis(10)).await;
    assert_eq!(
        h.host.trims(),
        vec![(9, TrimSeverity::UiHidden), (9, TrimSeverity::Background)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_death_clears_membership() {
    let h = harness();
    background_process(&h, 10, "com.example.brief").await;
    h.kill(10).await;

    assert_eq!(h.kernel.trim().tier(10), None);
    assert!(!h.kernel.trim().has_pending_first_idle(10));
    sleep(secs(661)).await;
    assert!(h.host.trims().is_empty());
}
