use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use super::{StopLossError, StopLossViolation};
use crate::campaign::Campaign;
use crate::config::HttpEndpointConfig;
use crate::http_client::{HttpCallError, JsonClient};

/// Delivers newly recorded violations to the campaign's manager.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(
        &self,
        violation: &StopLossViolation,
        campaign: &Campaign,
    ) -> Result<(), StopLossError>;
}

fn summary(violation: &StopLossViolation, campaign: &Campaign) -> String {
    format!(
        "Stop-loss {} on campaign \"{}\": net revenue {:.2} after {:.1}h",
        violation.kind, campaign.name, violation.net_revenue, violation.active_hours
    )
}

/// Writes alerts to the log only.
#[derive(Debug, Default)]
pub struct LogAlertNotifier;

#[async_trait]
impl AlertNotifier for LogAlertNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(
        &self,
        violation: &StopLossViolation,
        campaign: &Campaign,
    ) -> Result<(), StopLossError> {
        warn!(
            violation_id = %violation.id,
            campaign_id = %campaign.id,
            manager_id = %violation.manager_id,
            "{}",
            summary(violation, campaign)
        );
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: String,
    violation: &'a StopLossViolation,
    campaign_name: &'a str,
}

/// Posts alerts as JSON to a webhook.
pub struct WebhookAlertNotifier {
    client: JsonClient,
}

impl WebhookAlertNotifier {
    pub fn new(config: &HttpEndpointConfig) -> Result<Self, HttpCallError> {
        Ok(Self {
            client: JsonClient::new(config)?,
        })
    }
}

#[async_trait]
impl AlertNotifier for WebhookAlertNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(
        &self,
        violation: &StopLossViolation,
        campaign: &Campaign,
    ) -> Result<(), StopLossError> {
        let payload = WebhookPayload {
            text: summary(violation, campaign),
            violation,
            campaign_name: &campaign.name,
        };
        self.client.post_discard("", &payload).await?;
        Ok(())
    }
}
