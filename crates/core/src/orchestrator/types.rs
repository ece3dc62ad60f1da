//! Types for the campaign orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::campaign::CampaignStatus;

/// Errors that can occur during orchestration.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    #[error("cannot {operation} campaign {campaign_id} in status {current}")]
    InvalidState {
        campaign_id: String,
        current: CampaignStatus,
        operation: &'static str,
    },

    /// The campaign changed status too recently to be presumed stalled.
    #[error(
        "campaign {campaign_id} changed status {idle_minutes} minutes ago; \
         resume needs {required_minutes} minutes without progress"
    )]
    NotStale {
        campaign_id: String,
        idle_minutes: i64,
        required_minutes: i64,
    },

    /// Another resumer took over the same stall first.
    #[error("campaign {0} was resumed by another caller")]
    ResumeConflict(String),

    #[error("campaign store error: {0}")]
    Store(#[from] crate::campaign::CampaignError),

    #[error("article submission error: {0}")]
    Article(#[from] crate::article::ArticleError),

    #[error("creative generation error: {0}")]
    Creative(#[from] crate::creative::CreativeError),

    /// A stage found a column it depends on unset.
    #[error("missing data in campaign: {0}")]
    MissingData(&'static str),
}

/// Where a run left the campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub campaign_id: String,
    pub final_status: CampaignStatus,
    /// A status write was lost to a concurrent writer.
    pub interrupted: bool,
}
