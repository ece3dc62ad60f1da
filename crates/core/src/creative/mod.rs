//! AI creative generation collaborator.

mod http;
mod types;

pub use http::HttpCreativeGenerator;
pub use types::{CreativeAssets, CreativeRequest};

use async_trait::async_trait;
use thiserror::Error;

use crate::http_client::HttpCallError;

#[derive(Debug, Error)]
pub enum CreativeError {
    #[error("creative service error: {0}")]
    Http(#[from] HttpCallError),

    #[error("creative generation failed: {0}")]
    Generation(String),

    #[error("generated creative is unusable: {0}")]
    Unusable(String),
}

/// Produces ad copy and media for a campaign.
#[async_trait]
pub trait CreativeGenerator: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &CreativeRequest) -> Result<CreativeAssets, CreativeError>;
}

/// Reject creatives the launch adapters cannot use.
pub(crate) fn check_usable(assets: &CreativeAssets) -> Result<(), CreativeError> {
    if assets.headline.trim().is_empty() {
        return Err(CreativeError::Unusable("headline is empty".to_string()));
    }
    if !assets.has_media() {
        return Err(CreativeError::Unusable(
            "no images or videos were generated".to_string(),
        ));
    }
    Ok(())
}
