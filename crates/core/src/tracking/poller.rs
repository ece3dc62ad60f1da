use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{PollerConfig, TrackingStatusSource, UpstreamStatus};
use crate::metrics;

/// Observation passed to the progress callback after every query.
#[derive(Debug, Clone)]
pub struct PollProgress {
    pub attempt: u32,
    pub elapsed: Duration,
    /// `None` when the query itself failed.
    pub status: Option<UpstreamStatus>,
    pub error: Option<String>,
}

/// How a poll ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Ready {
        tracking_link: String,
        elapsed: Duration,
        attempts: u32,
    },
    /// Upstream stopped or deleted the article.
    Terminated {
        status: UpstreamStatus,
        elapsed: Duration,
        attempts: u32,
    },
    TimedOut {
        last_status: Option<UpstreamStatus>,
        elapsed: Duration,
        attempts: u32,
    },
}

impl PollOutcome {
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Ready { attempts, .. }
            | PollOutcome::Terminated { attempts, .. }
            | PollOutcome::TimedOut { attempts, .. } => *attempts,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            PollOutcome::Ready { elapsed, .. }
            | PollOutcome::Terminated { elapsed, .. }
            | PollOutcome::TimedOut { elapsed, .. } => *elapsed,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            PollOutcome::Ready { .. } => "ready",
            PollOutcome::Terminated { .. } => "terminated",
            PollOutcome::TimedOut { .. } => "timed_out",
        }
    }
}

/// Polls an article's status until it has a tracking link.
///
/// The loop carries a fixed deadline and the time of the next attempt.
/// Pending statuses, unknown statuses, "active" without a link and query
/// errors all wait for the next attempt; the deadline is never reset.
pub struct TrackingLinkPoller {
    source: Arc<dyn TrackingStatusSource>,
    config: PollerConfig,
}

impl TrackingLinkPoller {
    pub fn new(source: Arc<dyn TrackingStatusSource>, config: PollerConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub async fn poll(
        &self,
        reference_id: &str,
        on_progress: &(dyn Fn(&PollProgress) + Send + Sync),
    ) -> PollOutcome {
        let started = Instant::now();
        let deadline = started + self.config.max_wait();
        let interval = self.config.polling_interval();

        let mut attempts = 0u32;
        let mut last_status = None;

        let outcome = loop {
            let attempt_at = Instant::now();
            attempts += 1;
            metrics::TRACKING_POLL_ATTEMPTS.inc();

            let result = self.source.query(reference_id).await;
            let elapsed = started.elapsed();

            match result {
                Ok(report) => {
                    debug!(
                        reference_id = %reference_id,
                        attempt = attempts,
                        status = %report.status,
                        has_link = report.link().is_some(),
                        "Tracking status observed"
                    );
                    on_progress(&PollProgress {
                        attempt: attempts,
                        elapsed,
                        status: Some(report.status.clone()),
                        error: None,
                    });

                    if report.is_ready() {
                        let tracking_link = report.link().unwrap_or_default().to_string();
                        break PollOutcome::Ready {
                            tracking_link,
                            elapsed,
                            attempts,
                        };
                    }
                    if report.status.is_terminal() {
                        break PollOutcome::Terminated {
                            status: report.status,
                            elapsed,
                            attempts,
                        };
                    }
                    last_status = Some(report.status);
                }
                Err(e) => {
                    warn!(
                        reference_id = %reference_id,
                        attempt = attempts,
                        error = %e,
                        "Tracking status query failed, will retry"
                    );
                    on_progress(&PollProgress {
                        attempt: attempts,
                        elapsed,
                        status: None,
                        error: Some(e.to_string()),
                    });
                }
            }

            if Instant::now() >= deadline {
                break PollOutcome::TimedOut {
                    last_status,
                    elapsed: started.elapsed(),
                    attempts,
                };
            }

            let next_attempt_at = (attempt_at + interval).min(deadline);
            tokio::time::sleep_until(next_attempt_at).await;
        };

        metrics::TRACKING_POLL_OUTCOMES
            .with_label_values(&[outcome.label()])
            .inc();
        info!(
            reference_id = %reference_id,
            outcome = outcome.label(),
            attempts = outcome.attempts(),
            elapsed_secs = outcome.elapsed().as_secs(),
            "Tracking poll finished"
        );

        outcome
    }
}
