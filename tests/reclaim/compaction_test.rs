/*!
 * Compaction Tests
 * Debounce, replacement, throttling and group gating through the kernel
 */

use crate::support::{app, harness, Harness};
use pretty_assertions::assert_eq;
use reclaim_kernel::memory::OptimizerKind;
use reclaim_kernel::{CompactLevel, HostError, HostEventSink, Outcome, TrimTier};
use std::time::Duration;
use tokio::time::sleep;

const SETTLE: Duration = Duration::from_secs(6);

async fn idle_process(h: &Harness, pid: u32, package: &str) {
    let id = app(package);
    h.spawn(pid, &id, true).await;
    h.show(&id, 1).await;
    h.hide(&id, 1).await;
}

#[tokio::test(start_paused = true)]
async fn test_active_app_never_compacted() {
    let h = harness();
    let id = app("com.example.active");
    h.spawn(10, &id, true).await;
    h.show(&id, 1).await;

    for (previous, current) in [(0, 920), (920, 960), (100, 300), (300, 999)] {
        h.kernel.on_score_changed(10, previous, current);
        assert!(!h.kernel.compaction().is_pending(10));
    }
    sleep(SETTLE).await;
    assert!(h.host.compactions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_two_decisions_yield_one_request() {
    let h = harness();
    idle_process(&h, 20, "com.example.idle").await;

    h.kernel.on_score_changed(20, 100, 300);
    assert_eq!(h.kernel.compaction().pending_level(20), Some(CompactLevel::Partial));
    sleep(Duration::from_secs(1)).await;
    h.kernel.on_score_changed(20, 920, 960);
    assert_eq!(h.kernel.compaction().pending_level(20), Some(CompactLevel::Full));

    sleep(SETTLE).await;
    assert_eq!(h.host.compactions(), vec![(20, CompactLevel::Full)]);

    let stats = h.kernel.stats();
    assert_eq!(stats.compactions_scheduled, 2);
    assert_eq!(stats.compactions_replaced, 1);
    assert_eq!(stats.compactions_succeeded, 1);
}

#[tokio::test(start_paused = true)]
async fn test_full_throttle_window() {
    let h = harness();
    idle_process(&h, 30, "com.example.throttle").await;
    let throttle = h.kernel.config().compaction.throttle.full_full;
    let debounce = h.kernel.config().compaction.debounce;

    h.kernel.on_score_changed(30, 920, 960);
    sleep(debounce + Duration::from_millis(1)).await;
    assert_eq!(h.host.compactions().len(), 1);

    // the window is measured from when the first request ran
    sleep(throttle - Duration::from_millis(2)).await;
    h.kernel.on_score_changed(30, 960, 930);
    assert!(!h.kernel.compaction().is_pending(30));

    sleep(Duration::from_millis(2)).await;
    h.kernel.on_score_changed(30, 930, 970);
    assert_eq!(h.kernel.compaction().pending_level(30), Some(CompactLevel::Full));
}

#[tokio::test(start_paused = true)]
async fn test_return_to_foreground_before_fire_cancels() {
    let h = harness();
    let id = app("com.example.bounce");
    h.spawn(40, &id, true).await;
    h.show(&id, 1).await;
    h.hide(&id, 1).await;

    h.kernel.on_score_changed(40, 920, 960);
    h.show(&id, 2).await;
    assert!(!h.kernel.compaction().is_pending(40));

    sleep(SETTLE).await;
    assert!(h.host.compactions().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_host_failure_recorded_as_problem() {
    let h = harness();
    idle_process(&h, 50, "com.example.fail").await;
    h.host
        .fail_compaction(50, HostError::Rejected { pid: 50, reason: "frozen".into() });

    h.kernel.on_score_changed(50, 920, 960);
    sleep(SETTLE).await;

    let snapshot = h.kernel.process(50).unwrap();
    let result = snapshot
        .results
        .iter()
        .find(|r| r.optimizer == OptimizerKind::Compaction)
        .unwrap();
    assert_eq!(result.outcome, Outcome::Problem);
    assert_eq!(h.kernel.stats().compactions_failed, 1);
}

#[tokio::test(start_paused = true)]
async fn test_death_before_fire_drops_request() {
    let h = harness();
    idle_process(&h, 60, "com.example.short").await;
    h.kernel.on_score_changed(60, 920, 960);
    h.kill(60).await;

    sleep(SETTLE).await;
    assert!(h.host.compactions().is_empty());
    assert_eq!(h.kernel.compaction().pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_host_staleness_triggers_full() {
    let h = harness();
    idle_process(&h, 70, "com.example.stale").await;
    h.kernel.on_score_changed(70, 100, 600);
    assert!(!h.kernel.compaction().is_pending(70));

    h.host.set_allowed_to_compact(70, true);
    h.kernel.on_score_changed(70, 100, 600);
    assert_eq!(h.kernel.compaction().pending_level(70), Some(CompactLevel::Full));
}

#[tokio::test(start_paused = true)]
async fn test_destroy_after_hide_keeps_pending_compaction() {
    let h = harness();
    let id = app("com.example.closed");
    h.spawn(80, &id, true).await;
    h.show(&id, 1).await;
    h.hide(&id, 1).await;

    h.kernel.on_score_changed(80, 920, 960);
    h.destroy(&id, 1).await;
    assert!(h.kernel.app(&id).unwrap().managed);
    assert_eq!(h.kernel.compaction().pending_level(80), Some(CompactLevel::Full));
    assert!(h.kernel.compaction().is_reclaimable(80));

    h.kernel.on_score_changed(80, 960, 970);
    sleep(Duration::from_secs(30)).await;
    assert_eq!(h.host.compactions(), vec![(80, CompactLevel::Full)]);
    assert_eq!(h.kernel.trim().tier(80), Some(TrimTier::Background));
}
