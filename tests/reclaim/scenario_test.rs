/*!
 * End-to-end Scenario
 * One application walked through show, hide and a burst of score changes
 */

use crate::support::{app, harness};
use pretty_assertions::assert_eq;
use reclaim_kernel::{AppGroup, CompactLevel, HostEventSink, TrimSeverity, TrimTier};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_backgrounded_app_is_compacted_once() {
    let h = harness();
    let id = app("com.example.reader");

    h.spawn(100, &id, true).await;
    h.show(&id, 1).await;
    assert_eq!(h.kernel.app(&id).unwrap().group, AppGroup::Active);

    // active apps are never compacted
    h.kernel.on_score_changed(100, 0, 920);
    assert!(!h.kernel.compaction().is_pending(100));

    h.hide(&id, 1).await;
    assert_eq!(h.kernel.app(&id).unwrap().group, AppGroup::Idle);
    assert_eq!(h.kernel.trim().tier(100), Some(TrimTier::Background));
    assert!(h.kernel.trim().has_pending_first_idle(100));

    h.kernel.on_score_changed(100, 920, 960);
    assert_eq!(h.kernel.compaction().pending_level(100), Some(CompactLevel::Full));

    sleep(Duration::from_secs(2)).await;
    h.kernel.on_score_changed(100, 960, 955);
    assert_eq!(h.kernel.compaction().pending_level(100), Some(CompactLevel::Full));
    assert_eq!(h.kernel.stats().compactions_replaced, 1);

    sleep(Duration::from_secs(10)).await;
    assert_eq!(h.host.compactions(), vec![(100, CompactLevel::Full)]);
    assert_eq!(h.host.trims(), vec![(100, TrimSeverity::UiHidden)]);

    let process = h.kernel.process(100).unwrap();
    assert_eq!(process.pending_compaction, None);
    assert_eq!(process.current_score, Some(955));

    h.kill(100).await;
    assert!(h.kernel.apps().is_empty());
    assert_eq!(h.kernel.trim().member_count(), 0);
}
