//! Mock platform launcher for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::campaign::Platform;
use crate::platform::{LaunchReceipt, LaunchRequest, PlatformError, PlatformLauncher};

/// Mock implementation of the PlatformLauncher trait.
///
/// Succeeds with `<platform>-cmp-N` ids unless told to reject, optionally
/// only for specific accounts.
#[derive(Debug)]
pub struct MockPlatformLauncher {
    platform: Platform,
    launches: Arc<RwLock<Vec<LaunchRequest>>>,
    /// Rejects every launch with this message when set.
    rejection: Arc<RwLock<Option<String>>>,
    /// Rejects launches for these account ids.
    rejected_accounts: Arc<RwLock<Vec<String>>>,
    counter: AtomicU32,
}

impl MockPlatformLauncher {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            launches: Arc::new(RwLock::new(Vec::new())),
            rejection: Arc::new(RwLock::new(None)),
            rejected_accounts: Arc::new(RwLock::new(Vec::new())),
            counter: AtomicU32::new(0),
        }
    }

    pub async fn reject_all(&self, message: &str) {
        *self.rejection.write().await = Some(message.to_string());
    }

    pub async fn reject_account(&self, account_id: &str) {
        self.rejected_accounts
            .write()
            .await
            .push(account_id.to_string());
    }

    pub async fn recorded_launches(&self) -> Vec<LaunchRequest> {
        self.launches.read().await.clone()
    }

    pub async fn launch_count(&self) -> usize {
        self.launches.read().await.len()
    }
}

#[async_trait]
impl PlatformLauncher for MockPlatformLauncher {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchReceipt, PlatformError> {
        self.launches.write().await.push(request.clone());

        if let Some(ref message) = *self.rejection.read().await {
            return Err(PlatformError::Rejected(message.clone()));
        }
        if self
            .rejected_accounts
            .read()
            .await
            .contains(&request.account_id)
        {
            return Err(PlatformError::Rejected(format!(
                "account {} is disabled",
                request.account_id
            )));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let ad_count = (request.image_urls.len() + request.video_urls.len()).max(1);
        Ok(LaunchReceipt {
            platform_campaign_id: format!("{}-cmp-{}", self.platform, n),
            ad_ids: (1..=ad_count)
                .map(|i| format!("{}-ad-{}-{}", self.platform, n, i))
                .collect(),
        })
    }
}
