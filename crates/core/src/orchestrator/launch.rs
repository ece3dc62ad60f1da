//! Per-target launch and its tagged result.

use tracing::{info, warn};

use crate::campaign::{Campaign, PlatformErrorEntry, PlatformTarget, Platform};
use crate::creative::CreativeAssets;
use crate::platform::{
    select_media, AdCreationStrategy, LaunchReceipt, LaunchRequest, PlatformError,
    PlatformRegistry,
};

/// Result of launching one platform target.
#[derive(Debug, Clone)]
pub enum TargetOutcome {
    Launched {
        target_id: String,
        platform: Platform,
        account_id: String,
        strategy: AdCreationStrategy,
        receipt: LaunchReceipt,
    },
    Failed {
        target_id: String,
        platform: Platform,
        account_id: String,
        error: String,
    },
}

impl TargetOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TargetOutcome::Launched { .. })
    }

    pub fn target_id(&self) -> &str {
        match self {
            TargetOutcome::Launched { target_id, .. } | TargetOutcome::Failed { target_id, .. } => {
                target_id
            }
        }
    }

    /// A target found LAUNCHING when its run is gone. The platform may or
    /// may not have created the campaign, so it is failed rather than
    /// launched a second time.
    pub(super) fn interrupted(target: &PlatformTarget) -> Self {
        Self::failed(
            target,
            format!(
                "launch interrupted with unknown outcome; check {} account {} before retrying",
                target.platform, target.account_id
            ),
        )
    }

    fn failed(target: &PlatformTarget, error: impl Into<String>) -> Self {
        TargetOutcome::Failed {
            target_id: target.id.clone(),
            platform: target.platform,
            account_id: target.account_id.clone(),
            error: error.into(),
        }
    }
}

/// Failure entries for every failed outcome.
pub(super) fn platform_errors(outcomes: &[TargetOutcome]) -> Vec<PlatformErrorEntry> {
    outcomes
        .iter()
        .filter_map(|outcome| match outcome {
            TargetOutcome::Failed {
                platform,
                account_id,
                error,
                ..
            } => Some(PlatformErrorEntry {
                platform: *platform,
                account_id: account_id.clone(),
                message: error.clone(),
            }),
            TargetOutcome::Launched { .. } => None,
        })
        .collect()
}

/// Launch one target. Never fails; every problem becomes a `Failed` outcome.
pub(super) async fn launch_target(
    registry: &PlatformRegistry,
    campaign: &Campaign,
    target: &PlatformTarget,
    creative: &CreativeAssets,
    tracking_link: &str,
) -> TargetOutcome {
    if target.account_id.trim().is_empty() {
        return TargetOutcome::failed(target, "account id is empty");
    }
    let Some(launcher) = registry.get(target.platform) else {
        return TargetOutcome::failed(
            target,
            PlatformError::NotConfigured(target.platform).to_string(),
        );
    };

    let strategy = AdCreationStrategy::select(target.budget_mode, creative);
    let media = select_media(strategy, creative);
    let request = LaunchRequest {
        campaign_id: campaign.id.clone(),
        campaign_name: campaign.name.clone(),
        target_id: target.id.clone(),
        platform: target.platform,
        account_id: target.account_id.clone(),
        budget_mode: target.budget_mode,
        daily_budget: target.daily_budget,
        strategy,
        landing_url: campaign.offer.landing_url.clone(),
        tracking_link: tracking_link.to_string(),
        headline: creative.headline.clone(),
        primary_text: creative.primary_text.clone(),
        description: creative.description.clone(),
        call_to_action: creative.call_to_action.clone(),
        image_urls: media.image_urls,
        video_urls: media.video_urls,
    };

    info!(
        campaign_id = %campaign.id,
        platform = %target.platform,
        account_id = %target.account_id,
        strategy = strategy.as_str(),
        "Launching platform target"
    );

    match launcher.launch(&request).await {
        Ok(receipt) => TargetOutcome::Launched {
            target_id: target.id.clone(),
            platform: target.platform,
            account_id: target.account_id.clone(),
            strategy,
            receipt,
        },
        Err(e) => {
            warn!(
                campaign_id = %campaign.id,
                platform = %target.platform,
                error = %e,
                "Platform launch failed"
            );
            TargetOutcome::failed(target, e.to_string())
        }
    }
}
