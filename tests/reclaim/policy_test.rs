/*!
 * Policy Tests
 * Overrides, toggles and policy read failures as seen through the kernel
 */

use crate::support::{app, harness, harness_with_policy};
use mockall::mock;
use pretty_assertions::assert_eq;
use reclaim_kernel::{
    AppGroup, AppPolicy, CompactLevel, ConfigError, GlobalToggles, HostEventSink, Kernel, KernelConfig,
    KernelError, MemoryPolicyStore, PolicyError, PolicyStore, RecordingHost,
};
use std::sync::Arc;
use std::time::Duration;

mock! {
    pub Store {}

    impl PolicyStore for Store {
        fn app_policy(&self, package: &str) -> Result<AppPolicy, PolicyError>;
        fn toggles(&self) -> GlobalToggles;
    }
}

#[tokio::test(start_paused = true)]
async fn test_custom_main_score_is_imposed() {
    let h = harness();
    h.policy.set_app_policy(
        "com.example.pinned",
        AppPolicy {
            custom_main_score: Some(500),
            ..AppPolicy::default()
        },
    );
    let id = app("com.example.pinned");
    h.spawn(11, &id, true).await;
    h.spawn(12, &id, false).await;

    assert_eq!(h.kernel.on_score_changed(11, 0, 920), Some(500));
    assert_eq!(h.kernel.process(11).unwrap().current_score, Some(500));

    assert_eq!(h.kernel.on_score_changed(12, 0, 920), None);
    assert_eq!(h.kernel.process(12).unwrap().current_score, Some(920));
}

#[tokio::test(start_paused = true)]
async fn test_compaction_toggle_blocks_scheduling() {
    let h = harness();
    h.policy.update_toggles(|t| t.compaction = false);
    let id = app("com.example.nocompact");
    h.spawn(13, &id, true).await;
    h.show(&id, 1).await;
    h.hide(&id, 1).await;

    assert!(h.kernel.compaction().is_reclaimable(13));
    h.kernel.on_score_changed(13, 920, 960);
    assert!(!h.kernel.compaction().is_pending(13));

    h.policy.update_toggles(|t| t.compaction = true);
    h.kernel.on_score_changed(13, 960, 920);
    assert_eq!(h.kernel.compaction().pending_level(13), Some(CompactLevel::Full));
}

#[tokio::test(start_paused = true)]
async fn test_policy_read_failure_leaves_app_unmanaged() {
    let mut store = MockStore::new();
    store
        .expect_app_policy()
        .returning(|_| Err(PolicyError::Unavailable("settings offline".into())));
    store.expect_toggles().returning(GlobalToggles::default);

    let h = harness_with_policy(
        KernelConfig::default(),
        Arc::new(store),
        Arc::new(MemoryPolicyStore::new()),
    );
    let id = app("com.example.offline");
    h.spawn(14, &id, true).await;
    h.show(&id, 1).await;
    h.hide(&id, 1).await;

    let snapshot = h.kernel.app(&id).unwrap();
    assert_eq!(snapshot.group, AppGroup::Idle);
    assert!(!snapshot.managed);
    assert!(!h.kernel.compaction().is_reclaimable(14));
    assert_eq!(h.kernel.trim().tier(14), None);
    h.kernel.on_score_changed(14, 920, 960);
    assert!(!h.kernel.compaction().is_pending(14));

    tokio::time::sleep(Duration::from_secs(700)).await;
    assert!(h.host.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_require_surface_toggle_unmanages_closed_app() {
    let h = harness();
    h.policy.update_toggles(|t| t.require_surface = true);
    let id = app("com.example.service");
    h.spawn(15, &id, true).await;
    h.show(&id, 1).await;
    h.destroy(&id, 1).await;

    let snapshot = h.kernel.app(&id).unwrap();
    assert_eq!(snapshot.group, AppGroup::Idle);
    assert!(!snapshot.managed);
    assert!(!h.kernel.compaction().is_reclaimable(15));
    assert_eq!(h.kernel.trim().tier(15), None);
}

#[test]
fn test_builder_requires_host() {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let err = Kernel::builder()
        .with_runtime(runtime.handle().clone())
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, KernelError::MissingComponent("host")));
}

#[test]
fn test_builder_without_runtime_fails() {
    let err = Kernel::builder()
        .with_host(Arc::new(RecordingHost::new()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, KernelError::Runtime(_)));
}

#[tokio::test]
async fn test_builder_rejects_invalid_config() {
    let mut config = KernelConfig::default();
    config.compaction.debounce = Duration::ZERO;
    let err = Kernel::builder()
        .with_config(config)
        .with_host(Arc::new(RecordingHost::new()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, KernelError::Config(ConfigError::Invalid(_))));
}

#[tokio::test]
async fn test_kernel_from_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reclaim.json");
    std::fs::write(
        &path,
        r#"{"host": {"api_level": 26}, "trim": {"foreground_enabled": false}}"#,
    )
    .unwrap();

    let config = KernelConfig::from_file(&path).unwrap();
    let kernel = Kernel::builder()
        .with_config(config)
        .with_host(Arc::new(RecordingHost::new()))
        .build()
        .unwrap();
    assert_eq!(kernel.profile().name, "standard");
    assert!(!kernel.trim().is_foreground_enabled());
    kernel.shutdown().await;
}
