use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::StopLossError;
use crate::campaign::Campaign;
use crate::config::HttpEndpointConfig;
use crate::http_client::{HttpCallError, JsonClient};

/// Lifetime spend and revenue of a campaign across its platforms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub spend: f64,
    pub revenue: f64,
}

impl PerformanceSnapshot {
    pub fn net_revenue(&self) -> f64 {
        self.revenue - self.spend
    }
}

#[async_trait]
pub trait PerformanceSource: Send + Sync {
    async fn fetch(&self, campaign: &Campaign) -> Result<PerformanceSnapshot, StopLossError>;
}

/// Reads `GET /v1/campaigns/{id}/performance` from the reporting service.
pub struct HttpPerformanceSource {
    client: JsonClient,
}

impl HttpPerformanceSource {
    pub fn new(config: &HttpEndpointConfig) -> Result<Self, HttpCallError> {
        Ok(Self {
            client: JsonClient::new(config)?,
        })
    }
}

#[async_trait]
impl PerformanceSource for HttpPerformanceSource {
    async fn fetch(&self, campaign: &Campaign) -> Result<PerformanceSnapshot, StopLossError> {
        let path = format!(
            "/v1/campaigns/{}/performance",
            urlencoding::encode(&campaign.id)
        );
        let snapshot: PerformanceSnapshot = self.client.get_json(&path).await?;
        if !snapshot.spend.is_finite() || !snapshot.revenue.is_finite() {
            return Err(StopLossError::InvalidData(format!(
                "non-finite spend/revenue for campaign {}",
                campaign.id
            )));
        }
        Ok(snapshot)
    }
}
