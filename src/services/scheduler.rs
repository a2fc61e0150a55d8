use crate::error::AppError;
use crate::services::orchestrator::{CycleOrchestrator, CycleOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinError;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

// `tokio::time::interval` panics on a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Background loop that runs one cycle immediately and then one per interval
pub struct Scheduler {
    orchestrator: Arc<CycleOrchestrator>,
    interval: Duration,
}

impl Scheduler {
    /// Create a new scheduler
    ///
    /// # Arguments
    /// * `orchestrator` - Cycle to run
    /// * `interval` - Minimum spacing between cycle starts (default: 5 minutes)
    pub fn new(orchestrator: Arc<CycleOrchestrator>) -> Self {
        Self {
            orchestrator,
            interval: Duration::from_secs(300),
        }
    }

    /// Set update interval (at least 1ms)
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run cycles until `cancel` fires. Cycles never overlap: a cycle that
    /// overruns the interval is followed immediately by the next one.
    /// Returns the number of cycles run.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        let mut interval = time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            symbol = self.orchestrator.symbol(),
            "Scheduler started, will update every {:?}", self.interval
        );

        let mut cycles: u64 = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            cycles += 1;
            match self.orchestrator.run_cycle(cycles, &cancel).await {
                CycleOutcome::Completed(report) if report.chain_reference.is_degraded() => {
                    warn!(
                        cycle = cycles,
                        chain_reference = %report.chain_reference,
                        "Cycle completed with degraded chain reference"
                    );
                }
                CycleOutcome::Completed(_) => {}
                outcome => {
                    warn!(cycle = cycles, stage = outcome.final_stage().as_str(), "Cycle did not persist a price");
                }
            }
        }

        info!(cycles, "Scheduler stopped");
        cycles
    }
}

/// Error for a scheduler task that finished before shutdown was requested.
/// `run` only returns once cancelled, so any join result here is a failure.
pub fn unexpected_exit(joined: Result<u64, JoinError>) -> AppError {
    match joined {
        Ok(cycles) => AppError::Scheduler(format!("exited unexpectedly after {} cycles", cycles)),
        Err(e) if e.is_panic() => AppError::Scheduler(format!("panicked: {}", e)),
        Err(e) => AppError::Scheduler(format!("task failed: {}", e)),
    }
}
