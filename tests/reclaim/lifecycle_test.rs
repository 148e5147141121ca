/*!
 * Lifecycle Tests
 * Group transitions, registry consistency and cleanup through the kernel
 */

use crate::support::{app, harness};
use pretty_assertions::assert_eq;
use reclaim_kernel::{AppGroup, HostEventSink, SurfaceEventKind, SurfaceToken, TrimTier};

#[tokio::test]
async fn test_surface_events_drive_groups() {
    let h = harness();
    let id = app("com.example.mail");
    h.spawn(100, &id, true).await;
    assert_eq!(h.kernel.app(&id).unwrap().group, AppGroup::None);

    h.show(&id, 1).await;
    assert_eq!(h.kernel.app(&id).unwrap().group, AppGroup::Active);
    assert_eq!(h.kernel.trim().tier(100), Some(TrimTier::Foreground));

    h.hide(&id, 1).await;
    let snapshot = h.kernel.app(&id).unwrap();
    assert_eq!(snapshot.group, AppGroup::Idle);
    assert!(snapshot.managed);
    assert_eq!(snapshot.in_flight, 0);
    assert_eq!(h.kernel.trim().tier(100), Some(TrimTier::Background));
    assert!(h.kernel.compaction().is_reclaimable(100));

    h.show(&id, 2).await;
    assert_eq!(h.kernel.app(&id).unwrap().group, AppGroup::Active);
    assert!(!h.kernel.compaction().is_reclaimable(100));
    assert_eq!(h.kernel.stats().transitions, 3);
}

#[tokio::test]
async fn test_process_joining_idle_app_is_registered() {
    let h = harness();
    let id = app("com.example.maps");
    h.spawn(200, &id, true).await;
    h.show(&id, 1).await;
    h.hide(&id, 1).await;

    h.spawn(201, &id, false).await;
    assert_eq!(h.kernel.trim().tier(201), Some(TrimTier::Background));
    assert!(h.kernel.compaction().is_reclaimable(201));
    assert_eq!(h.kernel.app(&id).unwrap().processes, vec![200, 201]);
}

#[tokio::test]
async fn test_last_death_cleans_everything() {
    let h = harness();
    let id = app("com.example.game");
    h.spawn(300, &id, true).await;
    h.spawn(301, &id, false).await;
    h.show(&id, 1).await;
    h.hide(&id, 1).await;

    h.kill(300).await;
    assert!(h.kernel.app(&id).is_some());
    assert_eq!(h.kernel.trim().tier(300), None);

    h.kill(301).await;
    assert!(h.kernel.app(&id).is_none());
    assert!(h.kernel.process(301).is_none());
    assert_eq!(h.kernel.trim().tier(301), None);
    assert!(!h.kernel.compaction().is_reclaimable(301));
    assert!(!h.kernel.trim().has_pending_first_idle(301));
    assert_eq!(h.kernel.trim().member_count(), 0);
}

#[tokio::test]
async fn test_unknown_and_unresolvable_events_are_dropped() {
    let h = harness();
    h.kill(999).await;

    let ghost = app("com.example.ghost");
    h.host.set_unresolvable(ghost.clone());
    h.spawn(400, &ghost, true).await;
    h.show(&ghost, 1).await;

    assert!(h.kernel.app(&ghost).is_none());
    assert!(h.kernel.process(400).is_none());
    assert_eq!(h.kernel.stats().events_dropped, 2);
}

#[tokio::test]
async fn test_destroying_every_surface_goes_idle() {
    let h = harness();
    let id = app("com.example.reader");
    h.spawn(500, &id, true).await;
    h.show(&id, 1).await;
    h.show(&id, 2).await;

    h.destroy(&id, 1).await;
    assert_eq!(h.kernel.app(&id).unwrap().group, AppGroup::Active);
    h.destroy(&id, 2).await;

    let snapshot = h.kernel.app(&id).unwrap();
    assert_eq!(snapshot.group, AppGroup::Idle);
    assert_eq!(snapshot.surfaces, 0);
    assert!(snapshot.managed);
    assert_eq!(h.kernel.trim().tier(500), Some(TrimTier::Background));
    assert!(h.kernel.compaction().is_reclaimable(500));
}

#[tokio::test]
async fn test_non_interactive_host_refires_idle() {
    let h = harness();
    let id = app("com.example.player");
    h.spawn(600, &id, true).await;
    h.show(&id, 1).await;
    h.hide(&id, 1).await;
    let before = h.kernel.stats().transitions;

    h.hide(&id, 1).await;
    assert_eq!(h.kernel.stats().transitions, before);

    h.host.set_interactive(false);
    h.hide(&id, 1).await;
    assert_eq!(h.kernel.stats().transitions, before + 1);
    assert_eq!(h.kernel.app(&id).unwrap().group, AppGroup::Idle);
}

#[tokio::test]
async fn test_remove_app_purges_processes() {
    let h = harness();
    let id = app("com.example.chat");
    h.spawn(700, &id, true).await;
    h.spawn(701, &id, false).await;
    h.show(&id, 1).await;

    h.kernel.remove_app(&id);
    h.kernel.flush().await;
    assert!(h.kernel.processes().is_empty());
    assert_eq!(h.kernel.trim().member_count(), 0);

    // a late death for a purged process is harmless
    h.kernel.on_process_died(700);
    h.kernel.flush().await;
    assert!(h.kernel.apps().is_empty());
}

#[tokio::test]
async fn test_removal_is_ordered_after_queued_events() {
    let h = harness();
    let id = app("com.example.queued");

    h.kernel.on_process_created(710, id.clone(), true);
    h.kernel
        .on_surface_event(SurfaceEventKind::Shown, id.clone(), SurfaceToken(1));
    h.kernel.remove_app(&id);
    h.kernel.flush().await;

    assert!(h.kernel.apps().is_empty());
    assert!(h.kernel.process(710).is_none());
    assert_eq!(h.kernel.trim().member_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_churn_leaves_no_residue() {
    let h = std::sync::Arc::new(harness());
    let mut tasks = Vec::new();
    for n in 0..16u32 {
        let h = std::sync::Arc::clone(&h);
        tasks.push(tokio::spawn(async move {
            let id = app(&format!("com.example.app{n}"));
            let base = 1_000 + n * 10;
            for pid in base..base + 3 {
                h.spawn(pid, &id, pid == base).await;
            }
            for token in 0..5u64 {
                h.show(&id, token).await;
                h.hide(&id, token).await;
            }
            h.destroy(&id, 4).await;
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(h.kernel.apps().len(), 16);
    assert_eq!(h.kernel.processes().len(), 48);

    for n in 0..16u32 {
        let base = 1_000 + n * 10;
        for pid in base..base + 3 {
            h.kernel.on_process_died(pid);
        }
    }
    h.kernel.flush().await;

    assert!(h.kernel.apps().is_empty());
    assert!(h.kernel.processes().is_empty());
    assert_eq!(h.kernel.trim().member_count(), 0);
    assert_eq!(h.kernel.compaction().pending_count(), 0);
}
