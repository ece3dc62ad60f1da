use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{LaunchReceipt, LaunchRequest, PlatformError, PlatformLauncher};
use crate::campaign::Platform;
use crate::config::HttpEndpointConfig;
use crate::http_client::{HttpCallError, JsonClient};

#[derive(Debug, Deserialize)]
struct LaunchResponse {
    success: bool,
    #[serde(default)]
    platform_campaign_id: Option<String>,
    #[serde(default)]
    ad_ids: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

impl LaunchResponse {
    fn into_receipt(self) -> Result<LaunchReceipt, PlatformError> {
        if !self.success {
            return Err(PlatformError::Rejected(
                self.error
                    .unwrap_or_else(|| "launch failed without error message".to_string()),
            ));
        }
        match self.platform_campaign_id.filter(|id| !id.is_empty()) {
            Some(platform_campaign_id) => Ok(LaunchReceipt {
                platform_campaign_id,
                ad_ids: self.ad_ids,
            }),
            None => Err(PlatformError::InvalidResponse(
                "successful launch without platform_campaign_id".to_string(),
            )),
        }
    }
}

/// Launch adapter service for one platform, `POST /v1/campaigns`.
pub struct HttpPlatformLauncher {
    platform: Platform,
    client: JsonClient,
}

impl HttpPlatformLauncher {
    pub fn new(platform: Platform, config: &HttpEndpointConfig) -> Result<Self, HttpCallError> {
        Ok(Self {
            platform,
            client: JsonClient::new(config)?,
        })
    }
}

#[async_trait]
impl PlatformLauncher for HttpPlatformLauncher {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchReceipt, PlatformError> {
        let response: LaunchResponse = self.client.post_json("/v1/campaigns", request).await?;
        let receipt = response.into_receipt()?;
        info!(
            platform = %self.platform,
            campaign_id = %request.campaign_id,
            platform_campaign_id = %receipt.platform_campaign_id,
            ads = receipt.ad_ids.len(),
            "Platform campaign created"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<LaunchReceipt, PlatformError> {
        serde_json::from_str::<LaunchResponse>(json)
            .unwrap()
            .into_receipt()
    }

    #[test]
    fn test_success() {
        let receipt =
            parse(r#"{"success": true, "platform_campaign_id": "12000", "ad_ids": ["a1", "a2"]}"#)
                .unwrap();
        assert_eq!(receipt.platform_campaign_id, "12000");
        assert_eq!(receipt.ad_ids.len(), 2);
    }

    #[test]
    fn test_rejection_keeps_platform_message() {
        match parse(r#"{"success": false, "error": "(#100) Invalid account"}"#) {
            Err(PlatformError::Rejected(msg)) => assert_eq!(msg, "(#100) Invalid account"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_success_without_id_is_invalid() {
        assert!(matches!(
            parse(r#"{"success": true}"#),
            Err(PlatformError::InvalidResponse(_))
        ));
    }
}
