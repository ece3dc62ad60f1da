//! Campaign storage trait and types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::campaign::{Campaign, CampaignStatus, ErrorDetails, NewPlatformTarget, Offer, TargetStatus};
use crate::creative::CreativeAssets;

/// Error type for campaign storage operations.
#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("Campaign not found: {0}")]
    NotFound(String),

    #[error("Platform target not found: {0}")]
    TargetNotFound(String),

    #[error("Cannot {operation} campaign {campaign_id}: current status is {current}")]
    InvalidState {
        campaign_id: String,
        current: CampaignStatus,
        operation: String,
    },

    #[error("Invalid campaign: {0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Request to create a new campaign. Campaigns always start QUEUED.
#[derive(Debug, Clone)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub manager_id: String,
    pub offer: Offer,
    pub queue_order: Option<i64>,
    pub targets: Vec<NewPlatformTarget>,
}

/// Filter for querying campaigns.
#[derive(Debug, Clone)]
pub struct CampaignFilter {
    pub status: Option<CampaignStatus>,
    pub manager_id: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for CampaignFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignFilter {
    pub fn new() -> Self {
        Self {
            status: None,
            manager_id: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_status(mut self, status: CampaignStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_manager(mut self, manager_id: impl Into<String>) -> Self {
        self.manager_id = Some(manager_id.into());
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

/// Columns written together with a status change. `None` leaves the
/// stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct StatusUpdate {
    pub article_reference: Option<String>,
    pub tracking_link: Option<String>,
    pub creative: Option<CreativeAssets>,
    pub error_details: Option<ErrorDetails>,
    pub launched_at: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn article_reference(reference: impl Into<String>) -> Self {
        Self {
            article_reference: Some(reference.into()),
            ..Self::default()
        }
    }

    pub fn tracking_link(link: impl Into<String>) -> Self {
        Self {
            tracking_link: Some(link.into()),
            ..Self::default()
        }
    }

    pub fn creative(creative: CreativeAssets) -> Self {
        Self {
            creative: Some(creative),
            ..Self::default()
        }
    }

    pub fn launched(at: DateTime<Utc>) -> Self {
        Self {
            launched_at: Some(at),
            ..Self::default()
        }
    }

    pub fn failed(details: ErrorDetails) -> Self {
        Self {
            error_details: Some(details),
            ..Self::default()
        }
    }
}

/// Outcome of trying to claim a queued campaign.
#[derive(Debug, Clone)]
pub enum ClaimResult {
    /// The campaign moved QUEUED -> PENDING_ARTICLE.
    Claimed(Campaign),
    /// Another invocation moved the campaign first.
    AlreadyClaimed,
    /// The campaign is still QUEUED but another campaign holds the slot.
    Blocked,
}

/// Outcome of one platform target's launch.
#[derive(Debug, Clone)]
pub struct TargetUpdate {
    pub status: TargetStatus,
    pub platform_campaign_id: Option<String>,
    pub platform_ad_ids: Vec<String>,
    pub error: Option<String>,
    pub launched_at: Option<DateTime<Utc>>,
}

/// Trait for campaign storage backends.
///
/// Every status write is conditional on the current status; callers learn
/// whether they won through the returned `bool` or [`ClaimResult`].
pub trait CampaignStore: Send + Sync {
    /// Create a new QUEUED campaign with its platform targets.
    fn create(&self, request: CreateCampaignRequest) -> Result<Campaign, CampaignError>;

    fn get(&self, id: &str) -> Result<Option<Campaign>, CampaignError>;

    /// List campaigns matching the filter, newest first.
    fn list(&self, filter: &CampaignFilter) -> Result<Vec<Campaign>, CampaignError>;

    fn count(&self, filter: &CampaignFilter) -> Result<i64, CampaignError>;

    /// Number of campaigns in every status, in lifecycle order.
    fn count_by_status(&self) -> Result<Vec<(CampaignStatus, i64)>, CampaignError>;

    /// The campaign currently holding the launch slot, if any.
    fn find_processing(&self) -> Result<Option<Campaign>, CampaignError>;

    /// Oldest eligible QUEUED campaign: `queue_order` ascending with nulls
    /// last, then `queued_at`, then `created_at`.
    fn next_queued(&self) -> Result<Option<Campaign>, CampaignError>;

    /// Atomically move QUEUED -> PENDING_ARTICLE, provided the campaign is
    /// still QUEUED and no campaign is in the processing set.
    fn claim(&self, id: &str) -> Result<ClaimResult, CampaignError>;

    /// Move `id` from `expected` to `next`, writing `update` in the same
    /// statement. Returns false if the campaign was not in `expected`.
    fn compare_and_set_status(
        &self,
        id: &str,
        expected: CampaignStatus,
        next: CampaignStatus,
        update: StatusUpdate,
    ) -> Result<bool, CampaignError>;

    /// Move a non-terminal campaign to FAILED. Returns false if it was
    /// already ACTIVE or FAILED.
    fn fail_unless_terminal(&self, id: &str, details: ErrorDetails)
        -> Result<bool, CampaignError>;

    /// Manual retry: FAILED -> QUEUED, incrementing the retry count and
    /// putting the campaign at the back of its priority band.
    fn requeue_failed(&self, id: &str) -> Result<Campaign, CampaignError>;

    /// Take over a processing campaign for a resume.
    ///
    /// Succeeds only while `status_changed_at` still equals `observed`, so of
    /// several resumers that read the same row exactly one wins. The winner's
    /// write bumps `retry_count` and sets `status_changed_at` to `at`.
    /// Returns `None` when the campaign moved or was taken over first.
    fn begin_resume(
        &self,
        id: &str,
        observed: DateTime<Utc>,
        at: DateTime<Utc>,
    ) -> Result<Option<Campaign>, CampaignError>;

    /// Processing campaigns whose status has not changed since `before`.
    fn stale_processing(&self, before: DateTime<Utc>) -> Result<Vec<Campaign>, CampaignError>;

    /// Move a PENDING or FAILED target to LAUNCHING. Returns false if the
    /// target is already launching or live.
    fn claim_target(&self, target_id: &str) -> Result<bool, CampaignError>;

    /// Record the launch result of a LAUNCHING target. Returns false if the
    /// target was no longer LAUNCHING.
    fn update_target(&self, target_id: &str, update: TargetUpdate) -> Result<bool, CampaignError>;
}
