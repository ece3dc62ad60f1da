use chrono::{DateTime, Utc};
use thiserror::Error;

use super::AuditRecord;
use crate::campaign::{CampaignStatus, Platform};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Page size used when a caller does not ask for one.
pub const DEFAULT_AUDIT_PAGE: i64 = 100;

/// Selects the slice of a campaign's history an operator wants to see.
///
/// All conditions are ANDed. `status` matches any event that names the
/// status on either side of a transition (`from_status`, `to_status`) or
/// as the stage a stale campaign was failed in. `platform` matches the
/// per-platform launch outcomes.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub campaign_id: Option<String>,
    pub event_type: Option<String>,
    pub user_id: Option<String>,
    pub status: Option<CampaignStatus>,
    pub platform: Option<Platform>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self {
            limit: DEFAULT_AUDIT_PAGE,
            ..Default::default()
        }
    }

    /// Full history of one campaign.
    pub fn for_campaign(campaign_id: impl Into<String>) -> Self {
        Self::new().with_campaign_id(campaign_id)
    }

    pub fn with_campaign_id(mut self, campaign_id: impl Into<String>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_status(mut self, status: CampaignStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    pub fn with_time_range(
        mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Append-only campaign history.
pub trait AuditStore: Send + Sync {
    /// Returns the assigned row id.
    fn insert(&self, record: &AuditRecord) -> Result<i64, AuditError>;

    /// Newest first.
    fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>, AuditError>;

    /// Ignores `limit` and `offset`.
    fn count(&self, filter: &AuditFilter) -> Result<i64, AuditError>;
}
