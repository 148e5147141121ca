/*!
 * Sweep Task - Periodic Trim Driver
 *
 * Background task that runs one sweep per tick. Commands are only read
 * between sweeps, so a stop request never interrupts a sweep in progress;
 * it takes effect once the current sweep has finished.
 */

use crate::core::task::{run_guarded, TaskContext};
use crate::monitoring::generate_run_id;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, warn, Instrument};

/// Control messages for a sweep task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepCommand {
    /// Run a sweep now, outside the regular schedule
    Trigger,
    /// Stop after the current sweep
    Stop,
}

/// Handle to a periodic sweep
pub struct SweepTask {
    name: &'static str,
    command_tx: mpsc::UnboundedSender<SweepCommand>,
    handle: Option<JoinHandle<()>>,
}

impl SweepTask {
    /// Spawn a sweep that first runs after `first_run`, then every `period`
    ///
    /// The loop ends on its own once `sweep` resolves to `false`.
    pub fn spawn<F, Fut>(
        runtime: &Handle,
        name: &'static str,
        first_run: Duration,
        period: Duration,
        sweep: F,
    ) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let handle = runtime.spawn(run_sweep_loop(name, first_run, period, sweep, command_rx));

        info!(
            sweep = name,
            first_run_ms = first_run.as_millis() as u64,
            period_ms = period.as_millis() as u64,
            "Sweep task spawned"
        );

        Self {
            name,
            command_tx,
            handle: Some(handle),
        }
    }

    pub fn trigger(&self) {
        let _ = self.command_tx.send(SweepCommand::Trigger);
    }

    /// Request a stop once no sweep is running
    pub fn stop(&self) {
        let _ = self.command_tx.send(SweepCommand::Stop);
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop and wait for the loop to exit
    pub async fn shutdown(mut self) {
        let _ = self.command_tx.send(SweepCommand::Stop);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(sweep = self.name, error = %e, "Sweep task shutdown error");
            } else {
                info!(sweep = self.name, "Sweep task shutdown complete");
            }
        }
    }
}

async fn run_sweep_loop<F, Fut>(
    name: &'static str,
    first_run: Duration,
    period: Duration,
    mut sweep: F,
    mut command_rx: mpsc::UnboundedReceiver<SweepCommand>,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let context = TaskContext::new(name);
    let mut interval = tokio::time::interval_at(Instant::now() + first_run, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let run = tokio::select! {
            _ = interval.tick() => true,
            command = command_rx.recv() => match command {
                Some(SweepCommand::Trigger) => {
                    debug!(sweep = name, "Manual sweep trigger");
                    true
                }
                Some(SweepCommand::Stop) | None => {
                    info!(sweep = name, "Sweep task stopping");
                    break;
                }
            },
        };

        if run {
            let mut alive = true;
            let span = info_span!("sweep", sweep = name, run_id = %generate_run_id());
            run_guarded(
                &context,
                async {
                    alive = sweep().await;
                }
                .instrument(span),
            )
            .await;
            if !alive {
                debug!(sweep = name, "Sweep owner dropped");
                break;
            }
        }
    }
}

impl Drop for SweepTask {
    fn drop(&mut self) {
        if self.handle.is_some() {
            let _ = self.command_tx.send(SweepCommand::Stop);
        }
    }
}
