//! Scripted tracking status source for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::http_client::HttpCallError;
use crate::tracking::{StatusReport, TrackingError, TrackingStatusSource, UpstreamStatus};

/// Replays queued responses in order. The last one repeats once the queue
/// runs dry; with nothing queued every query reports `pending`.
#[derive(Debug, Default)]
pub struct ScriptedTrackingSource {
    script: Arc<RwLock<VecDeque<Result<StatusReport, String>>>>,
    last: Arc<RwLock<Option<Result<StatusReport, String>>>>,
    queries: Arc<RwLock<Vec<String>>>,
}

impl ScriptedTrackingSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an observation.
    pub async fn push_status(&self, status: &str, tracking_link: Option<&str>) {
        self.script.write().await.push_back(Ok(StatusReport {
            status: UpstreamStatus::from_upstream(status),
            tracking_link: tracking_link.map(String::from),
        }));
    }

    /// Queue a failed query.
    pub async fn push_error(&self, message: &str) {
        self.script.write().await.push_back(Err(message.to_string()));
    }

    /// Reference ids queried so far.
    pub async fn queries(&self) -> Vec<String> {
        self.queries.read().await.clone()
    }
}

#[async_trait]
impl TrackingStatusSource for ScriptedTrackingSource {
    async fn query(&self, reference_id: &str) -> Result<StatusReport, TrackingError> {
        self.queries.write().await.push(reference_id.to_string());

        let next = self.script.write().await.pop_front();
        let response = match next {
            Some(response) => {
                *self.last.write().await = Some(response.clone());
                response
            }
            None => self.last.read().await.clone().unwrap_or(Ok(StatusReport {
                status: UpstreamStatus::Pending,
                tracking_link: None,
            })),
        };

        response.map_err(|e| TrackingError::Http(HttpCallError::ConnectionFailed(e)))
    }
}
