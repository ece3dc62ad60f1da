//! Ad platform launch adapters.
//!
//! Each platform target of a campaign is launched through the
//! [`PlatformLauncher`] registered for its platform. Launchers upload media,
//! create the platform campaign and its ads, and hand back the platform's
//! identifiers.

mod http;
mod registry;
mod strategy;

pub use http::HttpPlatformLauncher;
pub use registry::PlatformRegistry;
pub use strategy::{select_media, AdCreationStrategy, SelectedMedia};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::campaign::{BudgetMode, Platform};
use crate::http_client::HttpCallError;

#[derive(Debug, Error)]
pub enum PlatformError {
    /// The platform refused the campaign; the message is the platform's.
    #[error("{0}")]
    Rejected(String),

    #[error("platform adapter error: {0}")]
    Http(#[from] HttpCallError),

    #[error("no launcher configured for platform {0}")]
    NotConfigured(Platform),

    #[error("invalid platform response: {0}")]
    InvalidResponse(String),
}

/// Everything a launcher needs for one platform target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchRequest {
    pub campaign_id: String,
    pub campaign_name: String,
    pub target_id: String,
    pub platform: Platform,
    pub account_id: String,
    pub budget_mode: BudgetMode,
    pub daily_budget: f64,
    pub strategy: AdCreationStrategy,
    pub landing_url: String,
    pub tracking_link: String,
    pub headline: String,
    pub primary_text: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub call_to_action: Option<String>,
    /// Media chosen for the strategy, in upload order.
    pub image_urls: Vec<String>,
    pub video_urls: Vec<String>,
}

/// Identifiers assigned by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchReceipt {
    pub platform_campaign_id: String,
    pub ad_ids: Vec<String>,
}

#[async_trait]
pub trait PlatformLauncher: Send + Sync {
    fn platform(&self) -> Platform;

    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchReceipt, PlatformError>;
}
