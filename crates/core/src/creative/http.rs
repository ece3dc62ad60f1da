use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{check_usable, CreativeAssets, CreativeError, CreativeGenerator, CreativeRequest};
use crate::config::HttpEndpointConfig;
use crate::http_client::{HttpCallError, JsonClient};

/// Creative service response. Generation failures come back as 200 with an error.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    creative: Option<CreativeAssets>,
    #[serde(default)]
    error: Option<String>,
}

/// Calls `POST /v1/creatives` on the creative service.
pub struct HttpCreativeGenerator {
    client: JsonClient,
}

impl HttpCreativeGenerator {
    pub fn new(config: &HttpEndpointConfig) -> Result<Self, HttpCallError> {
        Ok(Self {
            client: JsonClient::new(config)?,
        })
    }
}

#[async_trait]
impl CreativeGenerator for HttpCreativeGenerator {
    fn name(&self) -> &str {
        "http"
    }

    async fn generate(&self, request: &CreativeRequest) -> Result<CreativeAssets, CreativeError> {
        let response: GenerateResponse = self.client.post_json("/v1/creatives", request).await?;

        let creative = match (response.creative, response.error) {
            (_, Some(error)) => return Err(CreativeError::Generation(error)),
            (Some(creative), None) => creative,
            (None, None) => {
                return Err(CreativeError::Generation(
                    "response contained no creative".to_string(),
                ))
            }
        };

        check_usable(&creative)?;
        info!(
            campaign_id = %request.campaign_id,
            images = creative.image_urls.len(),
            videos = creative.video_urls.len(),
            "Creative generated"
        );
        Ok(creative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_response() {
        let json = r#"{
            "creative": {
                "headline": "Go solar",
                "primary_text": "Panels from $0 down",
                "image_urls": ["https://cdn/a.jpg", "https://cdn/b.jpg"]
            }
        }"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        let creative = response.creative.unwrap();
        assert_eq!(creative.image_urls.len(), 2);
        assert!(creative.video_urls.is_empty());
        assert!(response.error.is_none());
    }

    #[test]
    fn test_parse_error_response() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"error": "content policy"}"#).unwrap();
        assert!(response.creative.is_none());
        assert_eq!(response.error.as_deref(), Some("content policy"));
    }
}
