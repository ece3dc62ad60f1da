use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{CleanupConfig, CleanupError};
use crate::audit::{AuditEvent, AuditHandle};
use crate::campaign::{
    Campaign, CampaignStatus, CampaignStore, ErrorDetails, ErrorKind, StatusUpdate,
};
use crate::metrics;
use crate::platform::PlatformRegistry;

/// Result of one cleanup pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupReport {
    pub campaigns_scanned: usize,
    pub marked_failed: usize,
    pub left_untouched: usize,
    /// Ids of the campaigns this pass failed.
    pub failed_campaign_ids: Vec<String>,
    pub errors: Vec<String>,
}

/// Fails stale processing campaigns that cannot finish.
pub struct StuckStateCleanup {
    store: Arc<dyn CampaignStore>,
    platforms: PlatformRegistry,
    config: CleanupConfig,
    audit: Option<AuditHandle>,
}

impl StuckStateCleanup {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        platforms: PlatformRegistry,
        config: CleanupConfig,
        audit: Option<AuditHandle>,
    ) -> Self {
        Self {
            store,
            platforms,
            config,
            audit,
        }
    }

    pub async fn run(&self) -> Result<CleanupReport, CleanupError> {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<CleanupReport, CleanupError> {
        let cutoff = now - Duration::minutes(self.config.stale_after_minutes as i64);
        let stale = self.store.stale_processing(cutoff)?;

        let mut report = CleanupReport {
            campaigns_scanned: stale.len(),
            ..Default::default()
        };

        for campaign in &stale {
            let Some(reason) = self.failure_reason(campaign) else {
                info!(
                    campaign_id = %campaign.id,
                    status = %campaign.status,
                    retry_count = campaign.retry_count,
                    "Stale campaign left for resume"
                );
                report.left_untouched += 1;
                continue;
            };

            let details = ErrorDetails::new(campaign.status, ErrorKind::Stale, reason.clone());
            match self.store.compare_and_set_status(
                &campaign.id,
                campaign.status,
                CampaignStatus::Failed,
                StatusUpdate::failed(details),
            ) {
                Ok(true) => {
                    warn!(
                        campaign_id = %campaign.id,
                        status = %campaign.status,
                        reason = %reason,
                        "Stale campaign marked failed"
                    );
                    metrics::CLEANUP_MARKED_FAILED.inc();
                    metrics::CAMPAIGNS_FAILED
                        .with_label_values(&[ErrorKind::Stale.as_str()])
                        .inc();
                    self.emit(AuditEvent::StaleCampaignFailed {
                        campaign_id: campaign.id.clone(),
                        status: campaign.status.to_string(),
                        reason,
                    })
                    .await;
                    report.marked_failed += 1;
                    report.failed_campaign_ids.push(campaign.id.clone());
                }
                Ok(false) => {
                    // Moved on since the scan; no longer stale.
                    report.left_untouched += 1;
                }
                Err(e) => {
                    report.errors.push(format!("campaign {}: {}", campaign.id, e));
                }
            }
        }

        if report.campaigns_scanned > 0 {
            info!(
                scanned = report.campaigns_scanned,
                marked_failed = report.marked_failed,
                left_untouched = report.left_untouched,
                "Stuck-state cleanup finished"
            );
        }
        Ok(report)
    }

    /// Why a stale campaign can never finish, if it can't.
    fn failure_reason(&self, campaign: &Campaign) -> Option<String> {
        if campaign.platform_targets.is_empty() {
            return Some("campaign has no platform targets".to_string());
        }
        for target in &campaign.platform_targets {
            if target.account_id.trim().is_empty() {
                return Some(format!("{} target has no account id", target.platform));
            }
            if !self.platforms.contains(target.platform) {
                return Some(format!(
                    "no launcher configured for platform {}",
                    target.platform
                ));
            }
        }
        if campaign.retry_count >= self.config.max_retry_count {
            return Some(format!(
                "stuck in {} after {} retries",
                campaign.status, campaign.retry_count
            ));
        }
        None
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }
}
