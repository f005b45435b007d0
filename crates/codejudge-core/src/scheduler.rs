//! Periodic re-evaluation of every active challenge.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::service::EvaluationService;

/// Shortest allowed interval between iterations.
pub const MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Outcome of one scheduler iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Challenges evaluated without error.
    pub succeeded: Vec<String>,
    /// Challenges whose evaluation failed.
    pub failed: Vec<String>,
    /// Challenges skipped (inactive or without an id).
    pub skipped: usize,
}

pub struct Scheduler {
    service: Arc<EvaluationService>,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler. Intervals below [`MIN_INTERVAL`] are raised to it.
    pub fn new(service: Arc<EvaluationService>, interval: Duration) -> Self {
        Self {
            service,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run iterations until `cancel` fires.
    ///
    /// The token is only observed between iterations; an iteration in
    /// progress always runs to its end.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "starting evaluation scheduler");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            self.tick().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        info!("evaluation scheduler cancelled");
    }

    /// Evaluate every active challenge once. Failures are logged per
    /// challenge and never stop the remaining ones.
    pub async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        let challenges = match self.service.store().list_challenges().await {
            Ok(challenges) => challenges,
            Err(e) => {
                error!(error = %e, "failed to list challenges for scheduled evaluation");
                return report;
            }
        };
        if challenges.is_empty() {
            debug!("no challenges found for scheduled evaluation");
            return report;
        }

        for challenge in challenges {
            if !challenge.active {
                info!(challenge = %challenge.id, "skipping inactive challenge");
                report.skipped += 1;
                continue;
            }
            if challenge.id.is_empty() {
                warn!(name = %challenge.name, "skipping challenge without identifier");
                report.skipped += 1;
                continue;
            }

            info!(challenge = %challenge.id, "running scheduled evaluation");
            match self.service.run_for_challenge(&challenge.id, None).await {
                Ok(()) => report.succeeded.push(challenge.id),
                Err(e) => {
                    error!(challenge = %challenge.id, error = %e, "scheduled evaluation failed");
                    report.failed.push(challenge.id);
                }
            }
        }

        report
    }
}
