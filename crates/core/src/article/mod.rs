//! Content/article submission collaborator.
//!
//! Submitting an offer creates an article upstream. Acceptance yields a
//! reference id that the tracking poller later watches for a tracking link;
//! rejection carries the upstream reason, which is stored verbatim.

mod http;

pub use http::HttpArticleSubmitter;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::campaign::{Campaign, Offer};
use crate::http_client::HttpCallError;

#[derive(Debug, Error)]
pub enum ArticleError {
    #[error("content service error: {0}")]
    Http(#[from] HttpCallError),

    #[error("invalid content service response: {0}")]
    InvalidResponse(String),
}

/// Article submission for one campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleSubmission {
    pub campaign_id: String,
    pub campaign_name: String,
    pub offer: Offer,
}

impl From<&Campaign> for ArticleSubmission {
    fn from(campaign: &Campaign) -> Self {
        Self {
            campaign_id: campaign.id.clone(),
            campaign_name: campaign.name.clone(),
            offer: campaign.offer.clone(),
        }
    }
}

/// Upstream verdict on a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SubmissionResult {
    Accepted { reference_id: String },
    Rejected { reason: String },
}

#[async_trait]
pub trait ArticleSubmitter: Send + Sync {
    fn name(&self) -> &str;

    async fn submit(&self, submission: &ArticleSubmission)
        -> Result<SubmissionResult, ArticleError>;
}
