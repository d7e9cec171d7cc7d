//! Simulated download progress
//!
//! When a download is handed to the browser there is nothing to measure, so
//! a timer advances a synthetic percentage instead. Every update it emits is
//! tagged [`ProgressSource::Simulated`](crate::downloader::ProgressSource).

use crate::downloader::progress::DownloadProgress;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Time between updates
    pub interval: Duration,
    /// Percentage points added per update
    pub step_percent: f64,
    /// Speed reported when the total size is unknown
    pub assumed_speed_bps: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            step_percent: 5.0,
            assumed_speed_bps: 1024.0 * 1024.0,
        }
    }
}

impl SimulationConfig {
    fn step(&self) -> f64 {
        if self.step_percent > 0.0 {
            self.step_percent.min(100.0)
        } else {
            SimulationConfig::default().step_percent
        }
    }

    fn interval(&self) -> Duration {
        self.interval.max(Duration::from_millis(1))
    }

    /// Synthetic speed for one step
    fn speed(&self, total_bytes: u64) -> f64 {
        if total_bytes == 0 {
            return self.assumed_speed_bps;
        }
        let step_bytes = total_bytes as f64 * self.step() / 100.0;
        step_bytes / self.interval().as_secs_f64()
    }

    /// Synthetic time left at `percent`
    fn eta(&self, percent: f64) -> Duration {
        let remaining_steps = ((100.0 - percent).max(0.0) / self.step()).ceil() as u32;
        self.interval() * remaining_steps
    }
}

/// How a simulation run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationOutcome {
    Completed,
    Cancelled,
    /// Nobody is listening any more
    ReceiverClosed,
}

/// Timer-driven progress generator
#[derive(Debug, Clone, Default)]
pub struct ProgressSimulator {
    config: SimulationConfig,
}

impl ProgressSimulator {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Start emitting updates on `progress_tx`.
    ///
    /// `total_bytes` is the expected size when known; it only feeds the
    /// byte and speed figures. Must be called inside a tokio runtime.
    pub fn start(
        &self,
        total_bytes: Option<u64>,
        progress_tx: mpsc::Sender<DownloadProgress>,
    ) -> SimulationHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(run(
            self.config.clone(),
            total_bytes.unwrap_or(0),
            progress_tx,
            token.clone(),
        ));

        SimulationHandle {
            token: token.clone(),
            guard: token.drop_guard(),
            task,
        }
    }
}

/// Handle to a running simulation; dropping it cancels the simulation
pub struct SimulationHandle {
    token: CancellationToken,
    guard: DropGuard,
    task: JoinHandle<SimulationOutcome>,
}

impl SimulationHandle {
    /// Stop the simulation early
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the simulation to end
    pub async fn join(self) -> SimulationOutcome {
        let SimulationHandle { task, guard, .. } = self;
        // A panicked or aborted task can't have completed
        let outcome = task.await.unwrap_or(SimulationOutcome::Cancelled);
        guard.disarm();
        outcome
    }
}

async fn run(
    config: SimulationConfig,
    total_bytes: u64,
    progress_tx: mpsc::Sender<DownloadProgress>,
    token: CancellationToken,
) -> SimulationOutcome {
    let step = config.step();
    let speed = config.speed(total_bytes);
    let mut progress = DownloadProgress::simulated(total_bytes);
    let mut percent = 0.0_f64;

    if progress_tx.send(progress.clone()).await.is_err() {
        return SimulationOutcome::ReceiverClosed;
    }

    let mut ticker = tokio::time::interval(config.interval());
    // The first tick completes immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Progress simulation cancelled at {:.0}%", percent);
                progress.cancel();
                if progress_tx.send(progress).await.is_err() {
                    return SimulationOutcome::ReceiverClosed;
                }
                return SimulationOutcome::Cancelled;
            }
            _ = ticker.tick() => {}
        }

        percent = (percent + step).min(100.0);
        if percent >= 100.0 {
            progress.complete();
            progress.speed = speed;
            let _ = progress_tx.send(progress).await;
            debug!("Progress simulation reached 100%");
            return SimulationOutcome::Completed;
        }

        progress.advance_simulated(percent, speed, config.eta(percent));
        if progress_tx.send(progress.clone()).await.is_err() {
            return SimulationOutcome::ReceiverClosed;
        }
    }
}
