//! Testing utilities and mock implementations of the upstream collaborators.
//!
//! Every external service the launch pipeline talks to has a mock here,
//! so the queue, orchestrator and monitors can be exercised end to end
//! without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use launchpro_core::testing::{MockArticleSubmitter, ScriptedTrackingSource};
//!
//! let articles = MockArticleSubmitter::new();
//! let tracking = ScriptedTrackingSource::new();
//!
//! tracking.push_status("pending", None).await;
//! tracking.push_status("active", Some("https://trk.example/abc")).await;
//! ```

mod mock_article_submitter;
mod mock_creative_generator;
mod mock_performance_source;
mod mock_platform_launcher;
mod scripted_tracking_source;

pub use mock_article_submitter::MockArticleSubmitter;
pub use mock_creative_generator::MockCreativeGenerator;
pub use mock_performance_source::{MockAlertNotifier, MockPerformanceSource};
pub use mock_platform_launcher::MockPlatformLauncher;
pub use scripted_tracking_source::ScriptedTrackingSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::campaign::{BudgetMode, CreateCampaignRequest, NewPlatformTarget, Offer, Platform};
    use crate::creative::CreativeAssets;

    pub fn offer() -> Offer {
        Offer {
            offer_id: "offer-1".to_string(),
            name: "Summer Savings".to_string(),
            headline: Some("Save on summer travel".to_string()),
            content_brief: None,
            landing_url: "https://offers.example.com/summer".to_string(),
            country: Some("US".to_string()),
            language: Some("en".to_string()),
        }
    }

    /// CBO target with a 50.0 daily budget.
    pub fn target(platform: Platform, account_id: &str) -> NewPlatformTarget {
        NewPlatformTarget {
            platform,
            account_id: account_id.to_string(),
            budget_mode: BudgetMode::Cbo,
            daily_budget: 50.0,
        }
    }

    /// Request for a campaign owned by `manager-1` with one Meta target.
    pub fn campaign_request(name: &str) -> CreateCampaignRequest {
        CreateCampaignRequest {
            name: name.to_string(),
            manager_id: "manager-1".to_string(),
            offer: offer(),
            queue_order: None,
            targets: vec![target(Platform::Meta, "act_1")],
        }
    }

    pub fn creative(images: usize, videos: usize) -> CreativeAssets {
        CreativeAssets {
            headline: "Save on summer travel".to_string(),
            primary_text: "Deals end Sunday.".to_string(),
            description: None,
            call_to_action: Some("LEARN_MORE".to_string()),
            image_urls: (1..=images)
                .map(|i| format!("https://cdn.example.com/img{}.jpg", i))
                .collect(),
            video_urls: (1..=videos)
                .map(|i| format!("https://cdn.example.com/vid{}.mp4", i))
                .collect(),
        }
    }
}
