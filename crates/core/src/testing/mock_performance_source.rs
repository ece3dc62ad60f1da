//! Mock performance source and alert notifier for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::campaign::Campaign;
use crate::http_client::HttpCallError;
use crate::stoploss::{
    AlertNotifier, PerformanceSnapshot, PerformanceSource, StopLossError, StopLossViolation,
};

/// Per-campaign spend and revenue. Campaigns without numbers report zero.
#[derive(Debug, Default)]
pub struct MockPerformanceSource {
    snapshots: Arc<RwLock<HashMap<String, PerformanceSnapshot>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl MockPerformanceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_performance(&self, campaign_id: &str, spend: f64, revenue: f64) {
        self.snapshots
            .write()
            .await
            .insert(campaign_id.to_string(), PerformanceSnapshot { spend, revenue });
    }

    /// Make fetches for this campaign fail.
    pub async fn fail_for(&self, campaign_id: &str) {
        self.failing.write().await.insert(campaign_id.to_string());
    }
}

#[async_trait]
impl PerformanceSource for MockPerformanceSource {
    async fn fetch(&self, campaign: &Campaign) -> Result<PerformanceSnapshot, StopLossError> {
        if self.failing.read().await.contains(&campaign.id) {
            return Err(StopLossError::Http(HttpCallError::Timeout));
        }
        Ok(self
            .snapshots
            .read()
            .await
            .get(&campaign.id)
            .copied()
            .unwrap_or(PerformanceSnapshot {
                spend: 0.0,
                revenue: 0.0,
            }))
    }
}

/// Records every alert; can be told to fail.
#[derive(Debug, Default)]
pub struct MockAlertNotifier {
    alerts: Arc<RwLock<Vec<StopLossViolation>>>,
    fail: Arc<RwLock<bool>>,
}

impl MockAlertNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_failing(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn recorded_alerts(&self) -> Vec<StopLossViolation> {
        self.alerts.read().await.clone()
    }
}

#[async_trait]
impl AlertNotifier for MockAlertNotifier {
    fn name(&self) -> &str {
        "mock"
    }

    async fn notify(
        &self,
        violation: &StopLossViolation,
        _campaign: &Campaign,
    ) -> Result<(), StopLossError> {
        if *self.fail.read().await {
            return Err(StopLossError::Http(HttpCallError::ConnectionFailed(
                "webhook unreachable".to_string(),
            )));
        }
        self.alerts.write().await.push(violation.clone());
        Ok(())
    }
}
