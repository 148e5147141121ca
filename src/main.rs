/*!
 * reclaimd - Replay Driver
 *
 * Wires a kernel against the recording host and feeds it newline-delimited
 * JSON host events from stdin. Prints a stats snapshot on EOF or Ctrl-C.
 *
 * Environment:
 * - RECLAIM_CONFIG: path to a JSON configuration file
 * - RECLAIM_API_LEVEL / RECLAIM_WORKERS: configuration overrides
 */

use anyhow::Context;
use reclaim_kernel::{
    init_tracing, HostEvent, Kernel, KernelConfig, MemoryPolicyStore, RecordingHost,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

fn load_config() -> anyhow::Result<KernelConfig> {
    let config = match std::env::var("RECLAIM_CONFIG") {
        Ok(path) => KernelConfig::from_file(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        Err(_) => KernelConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = load_config()?;
    let host = Arc::new(RecordingHost::new());
    let kernel = Kernel::builder()
        .with_config(config)
        .with_host(host.clone())
        .with_policy(Arc::new(MemoryPolicyStore::new()))
        .build()?;

    info!(run_id = kernel.run_id(), "Replaying host events from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("reading stdin")?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                None
            }
        };
        let Some(line) = line else {
            break;
        };
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<HostEvent>(&line) {
            Ok(event) => {
                if let Some(score) = event.apply(&kernel) {
                    info!(line = line_no, score, "Custom main-process score imposed");
                }
            }
            Err(e) => warn!(line = line_no, error = %e, "Skipping malformed event"),
        }
    }

    kernel.flush().await;
    let report = serde_json::json!({
        "stats": kernel.stats(),
        "apps": kernel.apps(),
        "processes": kernel.processes(),
        "host_calls": host.calls().len(),
    });
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(serde_json::to_string_pretty(&report)?.as_bytes())
        .await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;

    kernel.shutdown().await;
    Ok(())
}
