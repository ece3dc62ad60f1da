use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{
    evaluate, AlertNotifier, NewViolation, PerformanceSource, StopLossConfig, StopLossError,
    StopLossViolation, ViolationStore,
};
use crate::audit::{AuditEvent, AuditHandle};
use crate::campaign::{Campaign, CampaignFilter, CampaignStatus, CampaignStore};
use crate::metrics;

const PAGE_SIZE: i64 = 100;

/// Result of one stop-loss scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopLossReport {
    pub campaigns_checked: usize,
    /// Violations recorded by this scan; open ones found again are not counted.
    pub violations_found: usize,
    pub alerts_sent: usize,
    /// One entry per campaign or alert that could not be processed.
    pub errors: Vec<String>,
}

/// Scans ACTIVE campaigns for loss-rule breaches.
pub struct StopLossMonitor {
    campaigns: Arc<dyn CampaignStore>,
    violations: Arc<dyn ViolationStore>,
    performance: Arc<dyn PerformanceSource>,
    notifier: Arc<dyn AlertNotifier>,
    config: StopLossConfig,
    audit: Option<AuditHandle>,
}

impl StopLossMonitor {
    pub fn new(
        campaigns: Arc<dyn CampaignStore>,
        violations: Arc<dyn ViolationStore>,
        performance: Arc<dyn PerformanceSource>,
        notifier: Arc<dyn AlertNotifier>,
        config: StopLossConfig,
        audit: Option<AuditHandle>,
    ) -> Self {
        Self {
            campaigns,
            violations,
            performance,
            notifier,
            config,
            audit,
        }
    }

    pub fn violations(&self) -> &Arc<dyn ViolationStore> {
        &self.violations
    }

    pub async fn check(&self) -> Result<StopLossReport, StopLossError> {
        self.check_at(Utc::now()).await
    }

    /// Scan as of `now`. Only listing the ACTIVE campaigns can fail the
    /// scan; anything per campaign lands in `errors`.
    pub async fn check_at(&self, now: DateTime<Utc>) -> Result<StopLossReport, StopLossError> {
        metrics::STOP_LOSS_CHECKS.inc();
        let campaigns = self.active_campaigns()?;
        let mut report = StopLossReport {
            campaigns_checked: campaigns.len(),
            ..Default::default()
        };

        for campaign in &campaigns {
            if let Err(e) = self.check_campaign(campaign, now, &mut report).await {
                warn!(campaign_id = %campaign.id, error = %e, "Stop-loss check failed");
                report.errors.push(format!("campaign {}: {}", campaign.id, e));
            }
        }

        info!(
            campaigns_checked = report.campaigns_checked,
            violations_found = report.violations_found,
            alerts_sent = report.alerts_sent,
            errors = report.errors.len(),
            "Stop-loss scan finished"
        );
        Ok(report)
    }

    fn active_campaigns(&self) -> Result<Vec<Campaign>, StopLossError> {
        let mut campaigns = Vec::new();
        let mut offset = 0;
        loop {
            let page = self.campaigns.list(
                &CampaignFilter::new()
                    .with_status(CampaignStatus::Active)
                    .with_limit(PAGE_SIZE)
                    .with_offset(offset),
            )?;
            let len = page.len() as i64;
            campaigns.extend(page);
            if len < PAGE_SIZE {
                return Ok(campaigns);
            }
            offset += PAGE_SIZE;
        }
    }

    async fn check_campaign(
        &self,
        campaign: &Campaign,
        now: DateTime<Utc>,
        report: &mut StopLossReport,
    ) -> Result<(), StopLossError> {
        let snapshot = self.performance.fetch(campaign).await?;
        let net_revenue = snapshot.net_revenue();
        let live_since = campaign.launched_at.unwrap_or(campaign.status_changed_at);
        let active_hours = (now - live_since).num_seconds().max(0) as f64 / 3600.0;

        for kind in evaluate(&self.config, net_revenue, active_hours) {
            let recorded = self.violations.record(NewViolation {
                campaign_id: campaign.id.clone(),
                manager_id: campaign.manager_id.clone(),
                kind,
                net_revenue,
                active_hours,
                detected_at: now,
            })?;

            let Some(violation) = recorded else {
                continue;
            };

            report.violations_found += 1;
            metrics::STOP_LOSS_VIOLATIONS
                .with_label_values(&[kind.as_str()])
                .inc();
            warn!(
                campaign_id = %campaign.id,
                kind = %kind,
                net_revenue,
                active_hours,
                "Stop-loss violation recorded"
            );
            self.emit(AuditEvent::StopLossViolationRaised {
                violation_id: violation.id.clone(),
                campaign_id: campaign.id.clone(),
                manager_id: campaign.manager_id.clone(),
                kind: kind.to_string(),
                net_revenue,
                active_hours,
            })
            .await;

            match self.notifier.notify(&violation, campaign).await {
                Ok(()) => {
                    report.alerts_sent += 1;
                    metrics::STOP_LOSS_ALERTS.with_label_values(&["sent"]).inc();
                }
                Err(e) => {
                    metrics::STOP_LOSS_ALERTS.with_label_values(&["failed"]).inc();
                    warn!(
                        violation_id = %violation.id,
                        notifier = self.notifier.name(),
                        error = %e,
                        "Stop-loss alert failed"
                    );
                    report
                        .errors
                        .push(format!("alert for violation {}: {}", violation.id, e));
                }
            }
        }

        Ok(())
    }

    /// Acknowledge an open violation on behalf of its manager or an admin.
    pub async fn acknowledge(
        &self,
        violation_id: &str,
        user_id: &str,
        is_admin: bool,
    ) -> Result<StopLossViolation, StopLossError> {
        let violation = self
            .violations
            .get(violation_id)?
            .ok_or_else(|| StopLossError::NotFound(violation_id.to_string()))?;

        if !violation.is_open() {
            return Err(StopLossError::AlreadyAcknowledged(violation_id.to_string()));
        }
        if !is_admin && violation.manager_id != user_id {
            return Err(StopLossError::NotOwner {
                violation_id: violation_id.to_string(),
                user_id: user_id.to_string(),
            });
        }

        if !self.violations.acknowledge(violation_id, user_id, Utc::now())? {
            return Err(StopLossError::AlreadyAcknowledged(violation_id.to_string()));
        }

        info!(violation_id = %violation_id, acknowledged_by = %user_id, "Stop-loss violation acknowledged");
        self.emit(AuditEvent::StopLossViolationAcknowledged {
            violation_id: violation_id.to_string(),
            campaign_id: violation.campaign_id.clone(),
            acknowledged_by: user_id.to_string(),
        })
        .await;

        self.violations
            .get(violation_id)?
            .ok_or_else(|| StopLossError::NotFound(violation_id.to_string()))
    }

    async fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.emit(event).await;
        }
    }
}
