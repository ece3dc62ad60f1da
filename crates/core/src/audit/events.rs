use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Campaign lifecycle
    CampaignCreated {
        campaign_id: String,
        created_by: String,
        name: String,
        platforms: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        queue_order: Option<i64>,
    },
    CampaignStatusChanged {
        campaign_id: String,
        from_status: String,
        to_status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    CampaignFailed {
        campaign_id: String,
        step: String,
        kind: String,
        message: String,
    },
    /// A failed campaign was put back in the queue by a user.
    CampaignRetried {
        campaign_id: String,
        retried_by: String,
        retry_count: u32,
    },
    /// A processing campaign was resumed from its current stage.
    CampaignResumed {
        campaign_id: String,
        resumed_by: String,
        from_status: String,
        retry_count: u32,
    },

    // Queue
    CampaignClaimed {
        campaign_id: String,
        remaining_queue: i64,
    },
    /// A claim or stage write lost its compare-and-swap.
    ClaimRaceLost {
        campaign_id: String,
        expected_status: String,
    },

    // Pipeline stages
    ArticleSubmitted {
        campaign_id: String,
        reference_id: String,
    },
    TrackingPollAttempt {
        campaign_id: String,
        reference_id: String,
        attempt: u32,
        elapsed_secs: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upstream_status: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    TrackingLinkAcquired {
        campaign_id: String,
        tracking_link: String,
        attempts: u32,
        elapsed_secs: u64,
    },
    CreativeGenerated {
        campaign_id: String,
        image_count: usize,
        video_count: usize,
    },
    PlatformLaunchSucceeded {
        campaign_id: String,
        platform: String,
        account_id: String,
        platform_campaign_id: String,
        ad_count: usize,
        strategy: String,
    },
    PlatformLaunchFailed {
        campaign_id: String,
        platform: String,
        account_id: String,
        error: String,
    },

    // Stop-loss
    StopLossViolationRaised {
        violation_id: String,
        campaign_id: String,
        manager_id: String,
        kind: String,
        net_revenue: f64,
        active_hours: f64,
    },
    StopLossViolationAcknowledged {
        violation_id: String,
        campaign_id: String,
        acknowledged_by: String,
    },

    // Cleanup
    StaleCampaignFailed {
        campaign_id: String,
        status: String,
        reason: String,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::CampaignCreated { .. } => "campaign_created",
            Self::CampaignStatusChanged { .. } => "campaign_status_changed",
            Self::CampaignFailed { .. } => "campaign_failed",
            Self::CampaignRetried { .. } => "campaign_retried",
            Self::CampaignResumed { .. } => "campaign_resumed",
            Self::CampaignClaimed { .. } => "campaign_claimed",
            Self::ClaimRaceLost { .. } => "claim_race_lost",
            Self::ArticleSubmitted { .. } => "article_submitted",
            Self::TrackingPollAttempt { .. } => "tracking_poll_attempt",
            Self::TrackingLinkAcquired { .. } => "tracking_link_acquired",
            Self::CreativeGenerated { .. } => "creative_generated",
            Self::PlatformLaunchSucceeded { .. } => "platform_launch_succeeded",
            Self::PlatformLaunchFailed { .. } => "platform_launch_failed",
            Self::StopLossViolationRaised { .. } => "stop_loss_violation_raised",
            Self::StopLossViolationAcknowledged { .. } => "stop_loss_violation_acknowledged",
            Self::StaleCampaignFailed { .. } => "stale_campaign_failed",
        }
    }

    /// Extract campaign_id if this event is campaign-related
    pub fn campaign_id(&self) -> Option<&str> {
        match self {
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
            Self::CampaignCreated { campaign_id, .. }
            | Self::CampaignStatusChanged { campaign_id, .. }
            | Self::CampaignFailed { campaign_id, .. }
            | Self::CampaignRetried { campaign_id, .. }
            | Self::CampaignResumed { campaign_id, .. }
            | Self::CampaignClaimed { campaign_id, .. }
            | Self::ClaimRaceLost { campaign_id, .. }
            | Self::ArticleSubmitted { campaign_id, .. }
            | Self::TrackingPollAttempt { campaign_id, .. }
            | Self::TrackingLinkAcquired { campaign_id, .. }
            | Self::CreativeGenerated { campaign_id, .. }
            | Self::PlatformLaunchSucceeded { campaign_id, .. }
            | Self::PlatformLaunchFailed { campaign_id, .. }
            | Self::StopLossViolationRaised { campaign_id, .. }
            | Self::StopLossViolationAcknowledged { campaign_id, .. }
            | Self::StaleCampaignFailed { campaign_id, .. } => Some(campaign_id),
        }
    }

    /// Extract user_id if this event was triggered by a user action
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::CampaignCreated { created_by, .. } => Some(created_by),
            Self::CampaignRetried { retried_by, .. } => Some(retried_by),
            Self::CampaignResumed { resumed_by, .. } => Some(resumed_by),
            Self::StopLossViolationAcknowledged {
                acknowledged_by, ..
            } => Some(acknowledged_by),
            _ => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub campaign_id: Option<String>,
    pub user_id: Option<String>,
    pub data: AuditEvent,
}
