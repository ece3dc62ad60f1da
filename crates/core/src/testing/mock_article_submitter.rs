//! Mock article submitter for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::article::{ArticleError, ArticleSubmission, ArticleSubmitter, SubmissionResult};
use crate::http_client::HttpCallError;

/// Mock implementation of the ArticleSubmitter trait.
///
/// Accepts every submission with a fresh `art-N` reference unless a
/// result or error is configured.
///
/// # Example
///
/// ```rust,ignore
/// use launchpro_core::article::SubmissionResult;
/// use launchpro_core::testing::MockArticleSubmitter;
///
/// let articles = MockArticleSubmitter::new();
/// articles.set_result(SubmissionResult::Rejected { reason: "policy".into() }).await;
/// ```
#[derive(Debug, Default)]
pub struct MockArticleSubmitter {
    submissions: Arc<RwLock<Vec<ArticleSubmission>>>,
    /// Returned for every submission when set.
    result: Arc<RwLock<Option<SubmissionResult>>>,
    /// If set, the next submission fails with a connection error carrying this message.
    next_error: Arc<RwLock<Option<String>>>,
    counter: AtomicU32,
}

impl MockArticleSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_result(&self, result: SubmissionResult) {
        *self.result.write().await = Some(result);
    }

    pub async fn set_next_error(&self, message: &str) {
        *self.next_error.write().await = Some(message.to_string());
    }

    pub async fn recorded_submissions(&self) -> Vec<ArticleSubmission> {
        self.submissions.read().await.clone()
    }
}

#[async_trait]
impl ArticleSubmitter for MockArticleSubmitter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(
        &self,
        submission: &ArticleSubmission,
    ) -> Result<SubmissionResult, ArticleError> {
        self.submissions.write().await.push(submission.clone());

        if let Some(message) = self.next_error.write().await.take() {
            return Err(ArticleError::Http(HttpCallError::ConnectionFailed(message)));
        }
        if let Some(ref result) = *self.result.read().await {
            return Ok(result.clone());
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SubmissionResult::Accepted {
            reference_id: format!("art-{}", n),
        })
    }
}
