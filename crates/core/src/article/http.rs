use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use super::{ArticleError, ArticleSubmission, ArticleSubmitter, SubmissionResult};
use crate::config::HttpEndpointConfig;
use crate::http_client::{HttpCallError, JsonClient};

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    accepted: bool,
    #[serde(default)]
    reference_id: Option<String>,
    #[serde(default)]
    reason: Option<String>,
}

impl SubmitResponse {
    fn into_result(self) -> Result<SubmissionResult, ArticleError> {
        if self.accepted {
            match self.reference_id.filter(|r| !r.is_empty()) {
                Some(reference_id) => Ok(SubmissionResult::Accepted { reference_id }),
                None => Err(ArticleError::InvalidResponse(
                    "accepted submission without reference_id".to_string(),
                )),
            }
        } else {
            Ok(SubmissionResult::Rejected {
                reason: self
                    .reason
                    .unwrap_or_else(|| "rejected without reason".to_string()),
            })
        }
    }
}

/// Body the content service sends with a 4xx answer.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error", alias = "message")]
    reason: Option<String>,
}

/// The rejection a non-retryable 4xx answer amounts to, if it is one.
///
/// The reason is the body's `reason` (or `error`/`message`) field when the
/// body is JSON, else the body text as sent.
fn rejection(error: &HttpCallError) -> Option<SubmissionResult> {
    let HttpCallError::Status { status, body } = error else {
        return None;
    };
    if !(400..500).contains(status) || error.is_retryable() {
        return None;
    }

    let reason = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.reason)
        .or_else(|| Some(body.trim().to_string()))
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| format!("content service answered HTTP {}", status));
    Some(SubmissionResult::Rejected { reason })
}

/// Calls `POST /v1/articles` on the content service.
pub struct HttpArticleSubmitter {
    client: JsonClient,
}

impl HttpArticleSubmitter {
    pub fn new(config: &HttpEndpointConfig) -> Result<Self, HttpCallError> {
        Ok(Self {
            client: JsonClient::new(config)?,
        })
    }
}

#[async_trait]
impl ArticleSubmitter for HttpArticleSubmitter {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit(
        &self,
        submission: &ArticleSubmission,
    ) -> Result<SubmissionResult, ArticleError> {
        let result = match self
            .client
            .post_json::<_, SubmitResponse>("/v1/articles", submission)
            .await
        {
            Ok(response) => response.into_result()?,
            Err(e) => rejection(&e).ok_or(ArticleError::Http(e))?,
        };

        match &result {
            SubmissionResult::Accepted { reference_id } => {
                info!(campaign_id = %submission.campaign_id, reference_id = %reference_id, "Article accepted")
            }
            SubmissionResult::Rejected { reason } => {
                warn!(campaign_id = %submission.campaign_id, reason = %reason, "Article rejected")
            }
        }
        Ok(result)
    }
}
