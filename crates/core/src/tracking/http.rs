use async_trait::async_trait;

use super::{StatusReport, TrackingError, TrackingStatusSource};
use crate::config::HttpEndpointConfig;
use crate::http_client::{HttpCallError, JsonClient};

/// Reads `GET /v1/articles/{reference}/status`.
pub struct HttpTrackingStatusSource {
    client: JsonClient,
}

impl HttpTrackingStatusSource {
    pub fn new(config: &HttpEndpointConfig) -> Result<Self, HttpCallError> {
        Ok(Self {
            client: JsonClient::new(config)?,
        })
    }
}

fn status_path(reference_id: &str) -> String {
    format!("/v1/articles/{}/status", urlencoding::encode(reference_id))
}

#[async_trait]
impl TrackingStatusSource for HttpTrackingStatusSource {
    async fn query(&self, reference_id: &str) -> Result<StatusReport, TrackingError> {
        if reference_id.is_empty() {
            return Err(TrackingError::InvalidResponse(
                "empty article reference".to_string(),
            ));
        }
        Ok(self.client.get_json(&status_path(reference_id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_is_encoded() {
        assert_eq!(status_path("art-1"), "/v1/articles/art-1/status");
        assert_eq!(status_path("a/b c"), "/v1/articles/a%2Fb%20c/status");
    }
}
