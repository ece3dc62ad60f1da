//! Campaign orchestrator implementation.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use tracing::{error, info, warn};

use crate::article::{ArticleSubmission, ArticleSubmitter, SubmissionResult};
use crate::audit::{AuditEvent, AuditHandle};
use crate::campaign::{
    Campaign, CampaignStatus, CampaignStore, ErrorDetails, ErrorKind, StatusUpdate,
    TargetStatus, TargetUpdate,
};
use crate::creative::{CreativeGenerator, CreativeRequest};
use crate::metrics;
use crate::platform::PlatformRegistry;
use crate::tracking::{PollOutcome, PollProgress, TrackingLinkPoller};

use super::launch::{launch_target, platform_errors, TargetOutcome};
use super::types::{OrchestratorError, RunOutcome};

/// How long a processing campaign must sit without a status change before
/// it may be resumed.
pub const DEFAULT_RESUME_AFTER_MINUTES: i64 = 30;

/// What a stage decided.
enum Step {
    /// The stage's transition was written; reload and keep going.
    Continue,
    /// The stage failed in an expected way.
    Fail(ErrorDetails),
    /// A compare-and-swap was lost.
    Lost,
}

/// Drives campaigns through the launch pipeline.
pub struct CampaignOrchestrator {
    store: Arc<dyn CampaignStore>,
    articles: Arc<dyn ArticleSubmitter>,
    poller: TrackingLinkPoller,
    creatives: Arc<dyn CreativeGenerator>,
    platforms: PlatformRegistry,
    audit: Option<AuditHandle>,
    resume_after: Duration,
}

impl CampaignOrchestrator {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        articles: Arc<dyn ArticleSubmitter>,
        poller: TrackingLinkPoller,
        creatives: Arc<dyn CreativeGenerator>,
        platforms: PlatformRegistry,
        audit: Option<AuditHandle>,
    ) -> Self {
        Self {
            store,
            articles,
            poller,
            creatives,
            platforms,
            audit,
            resume_after: Duration::minutes(DEFAULT_RESUME_AFTER_MINUTES),
        }
    }

    pub fn with_resume_after(mut self, resume_after: Duration) -> Self {
        self.resume_after = resume_after;
        self
    }

    /// True if the campaign is processing and has not changed status for
    /// at least the resume threshold.
    pub fn is_stale(&self, campaign: &Campaign, now: DateTime<Utc>) -> bool {
        campaign.status.is_processing() && now - campaign.status_changed_at >= self.resume_after
    }

    pub fn platforms(&self) -> &PlatformRegistry {
        &self.platforms
    }

    /// Run a freshly claimed campaign to completion.
    pub async fn start(&self, campaign: Campaign) -> Result<RunOutcome, OrchestratorError> {
        if campaign.status != CampaignStatus::PendingArticle {
            return Err(OrchestratorError::InvalidState {
                campaign_id: campaign.id,
                current: campaign.status,
                operation: "start",
            });
        }
        info!(campaign_id = %campaign.id, name = %campaign.name, "Starting campaign launch");
        self.run(campaign).await
    }

    /// Continue a stale processing campaign from its current stage.
    ///
    /// Counts as a retry. Only one resumer can take over a given stall, and
    /// platform targets that are already ACTIVE are not launched again.
    pub async fn resume(
        &self,
        campaign_id: &str,
        resumed_by: &str,
    ) -> Result<RunOutcome, OrchestratorError> {
        self.resume_at(campaign_id, resumed_by, Utc::now()).await
    }

    pub async fn resume_at(
        &self,
        campaign_id: &str,
        resumed_by: &str,
        now: DateTime<Utc>,
    ) -> Result<RunOutcome, OrchestratorError> {
        let campaign = self
            .store
            .get(campaign_id)?
            .ok_or_else(|| OrchestratorError::CampaignNotFound(campaign_id.to_string()))?;

        if !campaign.status.is_processing() {
            return Err(OrchestratorError::InvalidState {
                campaign_id: campaign.id,
                current: campaign.status,
                operation: "resume",
            });
        }
        if !self.is_stale(&campaign, now) {
            return Err(OrchestratorError::NotStale {
                campaign_id: campaign.id,
                idle_minutes: (now - campaign.status_changed_at).num_minutes(),
                required_minutes: self.resume_after.num_minutes(),
            });
        }

        let Some(campaign) =
            self.store
                .begin_resume(campaign_id, campaign.status_changed_at, now)?
        else {
            info!(campaign_id = %campaign_id, "Campaign taken over by another resumer");
            return Err(OrchestratorError::ResumeConflict(campaign_id.to_string()));
        };

        info!(
            campaign_id = %campaign.id,
            status = %campaign.status,
            retry_count = campaign.retry_count,
            resumed_by = %resumed_by,
            "Resuming campaign"
        );
        metrics::CAMPAIGNS_RESUMED.inc();
        self.emit(AuditEvent::CampaignResumed {
            campaign_id: campaign.id.clone(),
            resumed_by: resumed_by.to_string(),
            from_status: campaign.status.to_string(),
            retry_count: campaign.retry_count,
        })
        .await;

        self.run(campaign).await
    }

    /// Drive the campaign and turn any unexpected error into FAILED.
    ///
    /// Only returns an error if recording that failure also failed.
    async fn run(&self, campaign: Campaign) -> Result<RunOutcome, OrchestratorError> {
        let campaign_id = campaign.id.clone();
        let mut stage = campaign.status;

        match self.drive(campaign, &mut stage).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(
                    campaign_id = %campaign_id,
                    stage = %stage,
                    error = %e,
                    "Unexpected error during campaign launch"
                );
                let details = ErrorDetails::new(stage, ErrorKind::Internal, e.to_string())
                    .with_context(format!("{:?}", e));
                let failed = self.record_unexpected_failure(&campaign_id, stage, details).await?;
                Ok(RunOutcome {
                    campaign_id,
                    final_status: if failed { CampaignStatus::Failed } else { stage },
                    interrupted: !failed,
                })
            }
        }
    }

    async fn drive(
        &self,
        mut campaign: Campaign,
        stage: &mut CampaignStatus,
    ) -> Result<RunOutcome, OrchestratorError> {
        loop {
            *stage = campaign.status;
            if !stage.is_processing() {
                return Ok(RunOutcome {
                    campaign_id: campaign.id,
                    final_status: *stage,
                    interrupted: false,
                });
            }

            let timer = metrics::STAGE_DURATION
                .with_label_values(&[stage.as_str()])
                .start_timer();
            let step = match *stage {
                CampaignStatus::PendingArticle => self.submit_article(&campaign).await?,
                CampaignStatus::AwaitingTracking => self.acquire_tracking_link(&campaign).await?,
                CampaignStatus::ArticleApproved => self.begin_generation(&campaign).await?,
                CampaignStatus::GeneratingAi => self.generate_creative(&campaign).await?,
                CampaignStatus::Launching => self.launch(&campaign).await?,
                CampaignStatus::Queued | CampaignStatus::Active | CampaignStatus::Failed => {
                    Step::Continue
                }
            };
            timer.observe_duration();

            match step {
                Step::Continue => {
                    campaign = self
                        .store
                        .get(&campaign.id)?
                        .ok_or_else(|| OrchestratorError::CampaignNotFound(campaign.id.clone()))?;
                }
                Step::Fail(details) => {
                    let failed = self.fail(&campaign.id, *stage, details).await?;
                    return Ok(RunOutcome {
                        campaign_id: campaign.id,
                        final_status: if failed { CampaignStatus::Failed } else { *stage },
                        interrupted: !failed,
                    });
                }
                Step::Lost => {
                    let current = self
                        .store
                        .get(&campaign.id)?
                        .map(|c| c.status)
                        .unwrap_or(*stage);
                    return Ok(RunOutcome {
                        campaign_id: campaign.id,
                        final_status: current,
                        interrupted: true,
                    });
                }
            }
        }
    }

    // =========================================================================
    // Stages
    // =========================================================================

    async fn submit_article(&self, campaign: &Campaign) -> Result<Step, OrchestratorError> {
        let submission = ArticleSubmission::from(campaign);
        info!(
            campaign_id = %campaign.id,
            submitter = self.articles.name(),
            "Submitting article"
        );

        match self.articles.submit(&submission).await? {
            SubmissionResult::Accepted { reference_id } => {
                self.emit(AuditEvent::ArticleSubmitted {
                    campaign_id: campaign.id.clone(),
                    reference_id: reference_id.clone(),
                })
                .await;
                self.advance(
                    &campaign.id,
                    CampaignStatus::PendingArticle,
                    CampaignStatus::AwaitingTracking,
                    StatusUpdate::article_reference(reference_id),
                )
                .await
            }
            SubmissionResult::Rejected { reason } => Ok(Step::Fail(
                ErrorDetails::new(
                    CampaignStatus::PendingArticle,
                    ErrorKind::UpstreamRejected,
                    reason,
                )
                .with_context(format!("rejected by {} content service", self.articles.name())),
            )),
        }
    }

    async fn acquire_tracking_link(&self, campaign: &Campaign) -> Result<Step, OrchestratorError> {
        let reference_id = campaign
            .article_reference
            .clone()
            .ok_or(OrchestratorError::MissingData("article_reference"))?;

        let audit = self.audit.clone();
        let campaign_id = campaign.id.clone();
        let progress_reference = reference_id.clone();
        let on_progress = move |progress: &PollProgress| {
            if let Some(ref audit) = audit {
                audit.try_emit(AuditEvent::TrackingPollAttempt {
                    campaign_id: campaign_id.clone(),
                    reference_id: progress_reference.clone(),
                    attempt: progress.attempt,
                    elapsed_secs: progress.elapsed.as_secs(),
                    upstream_status: progress.status.as_ref().map(|s| s.to_string()),
                    error: progress.error.clone(),
                });
            }
        };

        match self.poller.poll(&reference_id, &on_progress).await {
            PollOutcome::Ready {
                tracking_link,
                elapsed,
                attempts,
            } => {
                self.emit(AuditEvent::TrackingLinkAcquired {
                    campaign_id: campaign.id.clone(),
                    tracking_link: tracking_link.clone(),
                    attempts,
                    elapsed_secs: elapsed.as_secs(),
                })
                .await;
                self.advance(
                    &campaign.id,
                    CampaignStatus::AwaitingTracking,
                    CampaignStatus::ArticleApproved,
                    StatusUpdate::tracking_link(tracking_link),
                )
                .await
            }
            PollOutcome::Terminated {
                status,
                elapsed,
                attempts,
            } => Ok(Step::Fail(
                ErrorDetails::new(
                    CampaignStatus::AwaitingTracking,
                    ErrorKind::TrackingTerminated,
                    format!("article {} was {} upstream", reference_id, status),
                )
                .with_context(format!(
                    "attempts: {}, elapsed: {}s",
                    attempts,
                    elapsed.as_secs()
                )),
            )),
            PollOutcome::TimedOut {
                last_status,
                elapsed,
                attempts,
            } => Ok(Step::Fail(
                ErrorDetails::new(
                    CampaignStatus::AwaitingTracking,
                    ErrorKind::TrackingTimeout,
                    format!(
                        "no tracking link for article {} after {} minutes",
                        reference_id,
                        self.poller.config().max_wait_minutes
                    ),
                )
                .with_context(format!(
                    "attempts: {}, elapsed: {}s, last upstream status: {}",
                    attempts,
                    elapsed.as_secs(),
                    last_status
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "none".to_string())
                )),
            )),
        }
    }

    async fn begin_generation(&self, campaign: &Campaign) -> Result<Step, OrchestratorError> {
        self.advance(
            &campaign.id,
            CampaignStatus::ArticleApproved,
            CampaignStatus::GeneratingAi,
            StatusUpdate::none(),
        )
        .await
    }

    async fn generate_creative(&self, campaign: &Campaign) -> Result<Step, OrchestratorError> {
        let tracking_link = campaign
            .tracking_link
            .as_deref()
            .ok_or(OrchestratorError::MissingData("tracking_link"))?;

        let request = CreativeRequest::for_campaign(campaign, tracking_link);
        info!(
            campaign_id = %campaign.id,
            generator = self.creatives.name(),
            "Generating creative"
        );
        let creative = self.creatives.generate(&request).await?;

        self.emit(AuditEvent::CreativeGenerated {
            campaign_id: campaign.id.clone(),
            image_count: creative.image_urls.len(),
            video_count: creative.video_urls.len(),
        })
        .await;

        self.advance(
            &campaign.id,
            CampaignStatus::GeneratingAi,
            CampaignStatus::Launching,
            StatusUpdate::creative(creative),
        )
        .await
    }

    async fn launch(&self, campaign: &Campaign) -> Result<Step, OrchestratorError> {
        let creative = campaign
            .creative
            .as_ref()
            .ok_or(OrchestratorError::MissingData("creative"))?;
        let tracking_link = campaign
            .tracking_link
            .as_deref()
            .ok_or(OrchestratorError::MissingData("tracking_link"))?;

        if campaign.platform_targets.is_empty() {
            return Ok(Step::Fail(ErrorDetails::new(
                CampaignStatus::Launching,
                ErrorKind::PlatformLaunch,
                "campaign has no platform targets",
            )));
        }

        let mut already_active = 0;
        let mut contended = 0;
        let mut claimed = Vec::new();
        let mut outcomes = Vec::new();
        for target in &campaign.platform_targets {
            match target.status {
                TargetStatus::Active => already_active += 1,
                TargetStatus::Launching => {
                    warn!(
                        campaign_id = %campaign.id,
                        target_id = %target.id,
                        platform = %target.platform,
                        "Platform target was mid-launch when its run stopped"
                    );
                    outcomes.push(TargetOutcome::interrupted(target));
                }
                TargetStatus::Pending | TargetStatus::Failed => {
                    if self.store.claim_target(&target.id)? {
                        claimed.push(target);
                    } else {
                        contended += 1;
                    }
                }
            }
        }
        if already_active > 0 {
            info!(
                campaign_id = %campaign.id,
                skipped = already_active,
                "Skipping platform targets that are already active"
            );
        }
        if contended > 0 && claimed.is_empty() && outcomes.is_empty() {
            self.race_lost(&campaign.id, CampaignStatus::Launching).await;
            return Ok(Step::Lost);
        }

        outcomes.extend(
            join_all(claimed.iter().map(|target| {
                launch_target(&self.platforms, campaign, target, creative, tracking_link)
            }))
            .await,
        );

        for outcome in &outcomes {
            self.record_target(campaign, outcome).await?;
        }

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        if succeeded + already_active > 0 {
            info!(
                campaign_id = %campaign.id,
                succeeded,
                failed = outcomes.len() - succeeded,
                previously_active = already_active,
                "Platform launch finished"
            );
            let step = self
                .advance(
                    &campaign.id,
                    CampaignStatus::Launching,
                    CampaignStatus::Active,
                    StatusUpdate::launched(Utc::now()),
                )
                .await?;
            if matches!(step, Step::Continue) {
                metrics::CAMPAIGNS_LAUNCHED.inc();
            }
            return Ok(step);
        }

        Ok(Step::Fail(
            ErrorDetails::new(
                CampaignStatus::Launching,
                ErrorKind::PlatformLaunch,
                format!("all {} platform targets failed", outcomes.len()),
            )
            .with_platform_errors(platform_errors(&outcomes)),
        ))
    }

    async fn record_target(
        &self,
        campaign: &Campaign,
        outcome: &TargetOutcome,
    ) -> Result<(), OrchestratorError> {
        let update = match outcome {
            TargetOutcome::Launched { receipt, .. } => TargetUpdate {
                status: TargetStatus::Active,
                platform_campaign_id: Some(receipt.platform_campaign_id.clone()),
                platform_ad_ids: receipt.ad_ids.clone(),
                error: None,
                launched_at: Some(Utc::now()),
            },
            TargetOutcome::Failed { error, .. } => TargetUpdate {
                status: TargetStatus::Failed,
                platform_campaign_id: None,
                platform_ad_ids: Vec::new(),
                error: Some(error.clone()),
                launched_at: None,
            },
        };
        if !self.store.update_target(outcome.target_id(), update)? {
            warn!(
                campaign_id = %campaign.id,
                target_id = %outcome.target_id(),
                success = outcome.is_success(),
                "Platform target moved by another writer, result not recorded"
            );
            return Ok(());
        }

        match outcome {
            TargetOutcome::Launched {
                platform,
                account_id,
                strategy,
                receipt,
                ..
            } => {
                metrics::PLATFORM_LAUNCHES
                    .with_label_values(&[platform.as_str(), "success"])
                    .inc();
                self.emit(AuditEvent::PlatformLaunchSucceeded {
                    campaign_id: campaign.id.clone(),
                    platform: platform.to_string(),
                    account_id: account_id.clone(),
                    platform_campaign_id: receipt.platform_campaign_id.clone(),
                    ad_count: receipt.ad_ids.len(),
                    strategy: strategy.as_str().to_string(),
                })
                .await;
            }
            TargetOutcome::Failed {
                platform,
                account_id,
                error,
                ..
            } => {
                metrics::PLATFORM_LAUNCHES
                    .with_label_values(&[platform.as_str(), "failure"])
                    .inc();
                self.emit(AuditEvent::PlatformLaunchFailed {
                    campaign_id: campaign.id.clone(),
                    platform: platform.to_string(),
                    account_id: account_id.clone(),
                    error: error.clone(),
                })
                .await;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Status writes
    // =========================================================================

    async fn advance(
        &self,
        campaign_id: &str,
        from: CampaignStatus,
        to: CampaignStatus,
        update: StatusUpdate,
    ) -> Result<Step, OrchestratorError> {
        if !self
            .store
            .compare_and_set_status(campaign_id, from, to, update)?
        {
            self.race_lost(campaign_id, from).await;
            return Ok(Step::Lost);
        }

        info!(campaign_id = %campaign_id, from = %from, to = %to, "Campaign status changed");
        metrics::CAMPAIGN_TRANSITIONS
            .with_label_values(&[from.as_str(), to.as_str()])
            .inc();
        self.emit(AuditEvent::CampaignStatusChanged {
            campaign_id: campaign_id.to_string(),
            from_status: from.to_string(),
            to_status: to.to_string(),
            reason: None,
        })
        .await;
        Ok(Step::Continue)
    }

    /// Returns false if the campaign had already left `stage`.
    async fn fail(
        &self,
        campaign_id: &str,
        stage: CampaignStatus,
        details: ErrorDetails,
    ) -> Result<bool, OrchestratorError> {
        let kind = details.kind;
        let message = details.message.clone();

        if !self.store.compare_and_set_status(
            campaign_id,
            stage,
            CampaignStatus::Failed,
            StatusUpdate::failed(details),
        )? {
            self.race_lost(campaign_id, stage).await;
            return Ok(false);
        }

        self.failed(campaign_id, stage, kind, message).await;
        Ok(true)
    }

    /// FAILED from whatever non-terminal status the campaign is in.
    async fn record_unexpected_failure(
        &self,
        campaign_id: &str,
        stage: CampaignStatus,
        details: ErrorDetails,
    ) -> Result<bool, OrchestratorError> {
        let message = details.message.clone();
        if !self.store.fail_unless_terminal(campaign_id, details)? {
            warn!(campaign_id = %campaign_id, "Campaign already terminal, failure not recorded");
            return Ok(false);
        }
        self.failed(campaign_id, stage, ErrorKind::Internal, message)
            .await;
        Ok(true)
    }

    async fn failed(&self, campaign_id: &str, stage: CampaignStatus, kind: ErrorKind, message: String) {
        warn!(
            campaign_id = %campaign_id,
            step = %stage,
            kind = kind.as_str(),
            message = %message,
            "Campaign failed"
        );
        metrics::CAMPAIGNS_FAILED
            .with_label_values(&[kind.as_str()])
            .inc();
        metrics::CAMPAIGN_TRANSITIONS
            .with_label_values(&[stage.as_str(), CampaignStatus::Failed.as_str()])
            .inc();
        self.emit(AuditEvent::CampaignStatusChanged {
            campaign_id: campaign_id.to_string(),
            from_status: stage.to_string(),
            to_status: CampaignStatus::Failed.to_string(),
            reason: Some(message.clone()),
        })
        .await;
        self.emit(AuditEvent::CampaignFailed {
            campaign_id: campaign_id.to_string(),
            step: stage.to_string(),
            kind: kind.as_str().to_string(),
            message,
        })
        .await;
    }

    async fn race_lost(&self, campaign_id: &str, expected: CampaignStatus) {
        info!(
            campaign_id = %campaign_id,
            expected = %expected,
            "Campaign moved by another writer, stopping run"
        );
        self.emit(AuditEvent::ClaimRaceLost {
            campaign_id: campaign_id.to_string(),
            expected_status: expected.to_string(),
        })
        .await;
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }
}
