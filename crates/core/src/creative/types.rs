use serde::{Deserialize, Serialize};

use crate::campaign::{Campaign, Offer, Platform};

/// Ad copy and media produced by the creative generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeAssets {
    pub headline: String,
    pub primary_text: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub call_to_action: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub video_urls: Vec<String>,
}

impl CreativeAssets {
    pub fn has_media(&self) -> bool {
        !self.image_urls.is_empty() || !self.video_urls.is_empty()
    }
}

/// Everything the generator needs to produce creatives for one campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreativeRequest {
    pub campaign_id: String,
    pub campaign_name: String,
    pub offer: Offer,
    pub tracking_link: String,
    /// Platforms the creatives will run on; generators size media for them.
    pub platforms: Vec<Platform>,
}

impl CreativeRequest {
    pub fn for_campaign(campaign: &Campaign, tracking_link: &str) -> Self {
        let mut platforms: Vec<Platform> = Vec::new();
        for target in &campaign.platform_targets {
            if !platforms.contains(&target.platform) {
                platforms.push(target.platform);
            }
        }

        Self {
            campaign_id: campaign.id.clone(),
            campaign_name: campaign.name.clone(),
            offer: campaign.offer.clone(),
            tracking_link: tracking_link.to_string(),
            platforms,
        }
    }
}
