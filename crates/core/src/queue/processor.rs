use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tracing::{error, info, warn};

use super::{CampaignRef, QueueError, QueueOutcome, QueueStatus, StatusCount};
use crate::audit::{AuditEvent, AuditHandle};
use crate::campaign::{
    Campaign, CampaignFilter, CampaignStatus, CampaignStore, ClaimResult, ErrorDetails, ErrorKind,
};
use crate::metrics;
use crate::orchestrator::{CampaignOrchestrator, OrchestratorError};

/// Recorded as `resumed_by` when the queue takes over a stalled campaign.
const QUEUE_RESUMER: &str = "queue-processor";

/// Claims queued campaigns one at a time and hands them to the orchestrator.
pub struct QueueProcessor {
    store: Arc<dyn CampaignStore>,
    orchestrator: Arc<CampaignOrchestrator>,
    audit: Option<AuditHandle>,
}

impl QueueProcessor {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        orchestrator: Arc<CampaignOrchestrator>,
        audit: Option<AuditHandle>,
    ) -> Self {
        Self {
            store,
            orchestrator,
            audit,
        }
    }

    /// Run one queue invocation.
    ///
    /// A campaign that has held the slot past the orchestrator's resume
    /// threshold is resumed instead of blocking the queue forever.
    ///
    /// Store errors before the claim are returned. Once a campaign is
    /// claimed or resumed, every failure ends with the campaign FAILED and
    /// a `StartFailed` outcome.
    pub async fn process(&self) -> Result<QueueOutcome, QueueError> {
        self.process_at(Utc::now()).await
    }

    pub async fn process_at(&self, now: DateTime<Utc>) -> Result<QueueOutcome, QueueError> {
        let outcome = self.process_inner(now).await?;
        metrics::QUEUE_INVOCATIONS
            .with_label_values(&[outcome.label()])
            .inc();
        Ok(outcome)
    }

    async fn process_inner(&self, now: DateTime<Utc>) -> Result<QueueOutcome, QueueError> {
        if let Some(processing) = self.store.find_processing()? {
            if self.orchestrator.is_stale(&processing, now) {
                return self.resume(processing, now).await;
            }
            info!(
                campaign_id = %processing.id,
                status = %processing.status,
                "Queue blocked by campaign in progress"
            );
            return Ok(QueueOutcome::Blocked {
                processing: Some(CampaignRef::from(&processing)),
            });
        }

        let Some(candidate) = self.store.next_queued()? else {
            return Ok(QueueOutcome::QueueEmpty);
        };

        let claimed = match self.store.claim(&candidate.id)? {
            ClaimResult::Claimed(campaign) => campaign,
            ClaimResult::AlreadyClaimed => {
                info!(campaign_id = %candidate.id, "Campaign already claimed by another invocation");
                self.emit(AuditEvent::ClaimRaceLost {
                    campaign_id: candidate.id.clone(),
                    expected_status: CampaignStatus::Queued.to_string(),
                })
                .await;
                return Ok(QueueOutcome::AlreadyClaimed {
                    campaign_id: candidate.id,
                });
            }
            ClaimResult::Blocked => {
                info!(campaign_id = %candidate.id, "Launch slot taken while claiming");
                let processing = self.store.find_processing()?;
                return Ok(QueueOutcome::Blocked {
                    processing: processing.as_ref().map(CampaignRef::from),
                });
            }
        };

        let remaining = self.remaining();
        info!(
            campaign_id = %claimed.id,
            name = %claimed.name,
            remaining,
            "Claimed campaign"
        );
        self.emit(AuditEvent::CampaignClaimed {
            campaign_id: claimed.id.clone(),
            remaining_queue: remaining,
        })
        .await;
        self.emit(AuditEvent::CampaignStatusChanged {
            campaign_id: claimed.id.clone(),
            from_status: CampaignStatus::Queued.to_string(),
            to_status: CampaignStatus::PendingArticle.to_string(),
            reason: Some("claimed by queue processor".to_string()),
        })
        .await;

        Ok(self.start(claimed, remaining).await)
    }

    async fn start(&self, campaign: Campaign, remaining: i64) -> QueueOutcome {
        let campaign_id = campaign.id.clone();
        let name = campaign.name.clone();

        let result = AssertUnwindSafe(self.orchestrator.start(campaign))
            .catch_unwind()
            .await;

        let error = match result {
            Ok(Ok(run)) => {
                return QueueOutcome::Started {
                    campaign_id,
                    name,
                    final_status: run.final_status,
                    remaining,
                }
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("orchestrator panicked: {}", panic_message(panic.as_ref())),
        };

        error!(campaign_id = %campaign_id, error = %error, "Campaign start failed");
        self.mark_start_failed(&campaign_id, &error).await;

        QueueOutcome::StartFailed {
            campaign_id,
            name,
            error,
            remaining,
        }
    }

    async fn resume(
        &self,
        campaign: Campaign,
        now: DateTime<Utc>,
    ) -> Result<QueueOutcome, QueueError> {
        let campaign_id = campaign.id.clone();
        let name = campaign.name.clone();
        let from_status = campaign.status;
        warn!(
            campaign_id = %campaign_id,
            status = %from_status,
            since = %campaign.status_changed_at,
            retry_count = campaign.retry_count,
            "Resuming stalled campaign holding the launch slot"
        );

        let result = AssertUnwindSafe(self.orchestrator.resume_at(&campaign_id, QUEUE_RESUMER, now))
            .catch_unwind()
            .await;

        let error = match result {
            Ok(Ok(run)) => {
                return Ok(QueueOutcome::Resumed {
                    campaign_id,
                    name,
                    from_status,
                    final_status: run.final_status,
                })
            }
            // Someone else moved or took over the campaign first.
            Ok(Err(
                OrchestratorError::NotStale { .. }
                | OrchestratorError::ResumeConflict(_)
                | OrchestratorError::InvalidState { .. },
            )) => {
                let processing = self.store.find_processing()?;
                return Ok(QueueOutcome::Blocked {
                    processing: processing.as_ref().map(CampaignRef::from),
                });
            }
            Ok(Err(e)) => e.to_string(),
            Err(panic) => format!("orchestrator panicked: {}", panic_message(panic.as_ref())),
        };

        error!(campaign_id = %campaign_id, error = %error, "Campaign resume failed");
        self.mark_start_failed(&campaign_id, &error).await;

        Ok(QueueOutcome::StartFailed {
            campaign_id,
            name,
            error,
            remaining: self.remaining(),
        })
    }

    /// Best effort: a failed write here is logged, never returned.
    async fn mark_start_failed(&self, campaign_id: &str, error: &str) {
        let step = match self.store.get(campaign_id) {
            Ok(Some(campaign)) => campaign.status,
            _ => CampaignStatus::PendingArticle,
        };
        let details = ErrorDetails::new(step, ErrorKind::Internal, error.to_string());

        match self.store.fail_unless_terminal(campaign_id, details) {
            Ok(true) => {
                metrics::CAMPAIGNS_FAILED
                    .with_label_values(&[ErrorKind::Internal.as_str()])
                    .inc();
                self.emit(AuditEvent::CampaignFailed {
                    campaign_id: campaign_id.to_string(),
                    step: step.to_string(),
                    kind: ErrorKind::Internal.as_str().to_string(),
                    message: error.to_string(),
                })
                .await;
            }
            Ok(false) => {
                warn!(campaign_id = %campaign_id, "Campaign already terminal after start failure")
            }
            Err(e) => {
                error!(campaign_id = %campaign_id, error = %e, "Failed to mark campaign as failed")
            }
        }
    }

    fn remaining(&self) -> i64 {
        self.store
            .count(&CampaignFilter::new().with_status(CampaignStatus::Queued))
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to count queued campaigns");
                0
            })
    }

    /// Read-only summary of the queue.
    pub fn status(&self) -> Result<QueueStatus, QueueError> {
        let processing = self.store.find_processing()?;
        let next = self.store.next_queued()?;
        let counts: Vec<StatusCount> = self
            .store
            .count_by_status()?
            .into_iter()
            .map(|(status, count)| StatusCount { status, count })
            .collect();
        let queued = counts
            .iter()
            .find(|c| c.status == CampaignStatus::Queued)
            .map(|c| c.count)
            .unwrap_or(0);

        Ok(QueueStatus {
            processing: processing.as_ref().map(CampaignRef::from),
            next: next.as_ref().map(CampaignRef::from),
            queued,
            counts,
        })
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
