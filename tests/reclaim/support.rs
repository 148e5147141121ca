/*!
 * Shared test harness
 * Kernel wired against the recording host, with helpers that wait for dispatch
 */

use reclaim_kernel::{
    HostEventSink, Identity, Kernel, KernelConfig, MemoryPolicyStore, Pid, PolicyStore,
    RecordingHost, SurfaceEventKind, SurfaceToken,
};
use std::sync::Arc;

pub struct Harness {
    pub kernel: Kernel,
    pub host: Arc<RecordingHost>,
    pub policy: Arc<MemoryPolicyStore>,
}

pub fn app(package: &str) -> Identity {
    Identity::new(0, package)
}

pub fn harness() -> Harness {
    harness_with(KernelConfig::default())
}

pub fn harness_with(config: KernelConfig) -> Harness {
    let policy = Arc::new(MemoryPolicyStore::new());
    harness_with_policy(config, policy.clone(), policy)
}

pub fn harness_with_policy(
    config: KernelConfig,
    store: Arc<dyn PolicyStore>,
    policy: Arc<MemoryPolicyStore>,
) -> Harness {
    let host = Arc::new(RecordingHost::new());
    let kernel = Kernel::builder()
        .with_config(config)
        .with_host(host.clone())
        .with_policy(store)
        .build()
        .expect("kernel builds inside a runtime");
    Harness {
        kernel,
        host,
        policy,
    }
}

impl Harness {
    pub async fn spawn(&self, pid: Pid, identity: &Identity, is_main: bool) {
        self.kernel.on_process_created(pid, identity.clone(), is_main);
        self.kernel.flush().await;
    }

    pub async fn kill(&self, pid: Pid) {
        self.kernel.on_process_died(pid);
        self.kernel.flush().await;
    }

    pub async fn surface(&self, kind: SurfaceEventKind, identity: &Identity, token: u64) {
        self.kernel
            .on_surface_event(kind, identity.clone(), SurfaceToken(token));
        self.kernel.flush().await;
    }

    pub async fn show(&self, identity: &Identity, token: u64) {
        self.surface(SurfaceEventKind::Shown, identity, token).await;
    }

    pub async fn hide(&self, identity: &Identity, token: u64) {
        self.surface(SurfaceEventKind::Hidden, identity, token).await;
    }

    pub async fn destroy(&self, identity: &Identity, token: u64) {
        self.surface(SurfaceEventKind::Destroyed, identity, token).await;
    }
}
