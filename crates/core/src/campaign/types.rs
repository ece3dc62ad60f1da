//! Campaign domain types.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::creative::CreativeAssets;

/// Maximum stored length of [`ErrorDetails::context`], in characters.
pub const MAX_ERROR_CONTEXT_CHARS: usize = 2000;

/// Lifecycle status of a campaign.
///
/// `Queued` is the only initial status; `Active` and `Failed` are terminal.
/// Everything in between is the processing set, of which at most one
/// campaign may be a member at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Queued,
    PendingArticle,
    AwaitingTracking,
    ArticleApproved,
    GeneratingAi,
    Launching,
    Active,
    Failed,
}

impl CampaignStatus {
    /// Statuses that hold the single launch slot.
    pub const PROCESSING: [CampaignStatus; 5] = [
        CampaignStatus::PendingArticle,
        CampaignStatus::AwaitingTracking,
        CampaignStatus::ArticleApproved,
        CampaignStatus::GeneratingAi,
        CampaignStatus::Launching,
    ];

    pub const ALL: [CampaignStatus; 8] = [
        CampaignStatus::Queued,
        CampaignStatus::PendingArticle,
        CampaignStatus::AwaitingTracking,
        CampaignStatus::ArticleApproved,
        CampaignStatus::GeneratingAi,
        CampaignStatus::Launching,
        CampaignStatus::Active,
        CampaignStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Queued => "QUEUED",
            CampaignStatus::PendingArticle => "PENDING_ARTICLE",
            CampaignStatus::AwaitingTracking => "AWAITING_TRACKING",
            CampaignStatus::ArticleApproved => "ARTICLE_APPROVED",
            CampaignStatus::GeneratingAi => "GENERATING_AI",
            CampaignStatus::Launching => "LAUNCHING",
            CampaignStatus::Active => "ACTIVE",
            CampaignStatus::Failed => "FAILED",
        }
    }

    pub fn is_processing(&self) -> bool {
        Self::PROCESSING.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CampaignStatus::Active | CampaignStatus::Failed)
    }
}

impl fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown campaign status: {}", s))
    }
}

/// Ad platform a campaign can be launched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Meta,
    Tiktok,
    Google,
    Taboola,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Meta => "meta",
            Platform::Tiktok => "tiktok",
            Platform::Google => "google",
            Platform::Taboola => "taboola",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "meta" => Ok(Platform::Meta),
            "tiktok" => Ok(Platform::Tiktok),
            "google" => Ok(Platform::Google),
            "taboola" => Ok(Platform::Taboola),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// Where the daily budget is managed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetMode {
    /// Campaign budget optimisation: one budget shared by all ads.
    #[default]
    Cbo,
    /// Ad-set budget optimisation: each ad set has its own budget.
    Abo,
}

/// Launch status of a single platform target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TargetStatus {
    Pending,
    /// Claimed by a run that is calling the platform. A target left here
    /// by a dead run has an unknown outcome and is never relaunched.
    Launching,
    Active,
    Failed,
}

impl TargetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetStatus::Pending => "PENDING",
            TargetStatus::Launching => "LAUNCHING",
            TargetStatus::Active => "ACTIVE",
            TargetStatus::Failed => "FAILED",
        }
    }
}

impl FromStr for TargetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TargetStatus::Pending),
            "LAUNCHING" => Ok(TargetStatus::Launching),
            "ACTIVE" => Ok(TargetStatus::Active),
            "FAILED" => Ok(TargetStatus::Failed),
            other => Err(format!("unknown target status: {}", other)),
        }
    }
}

/// Content source a campaign promotes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub offer_id: String,
    pub name: String,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub content_brief: Option<String>,
    pub landing_url: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// One ad platform destination of a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformTarget {
    pub id: String,
    pub campaign_id: String,
    pub platform: Platform,
    pub account_id: String,
    pub budget_mode: BudgetMode,
    pub daily_budget: f64,
    pub status: TargetStatus,
    pub platform_campaign_id: Option<String>,
    pub platform_ad_ids: Vec<String>,
    pub error: Option<String>,
    pub launched_at: Option<DateTime<Utc>>,
}

/// Platform target as supplied at campaign creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPlatformTarget {
    pub platform: Platform,
    pub account_id: String,
    #[serde(default)]
    pub budget_mode: BudgetMode,
    pub daily_budget: f64,
}

/// Classification of a campaign failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The content system refused the article.
    UpstreamRejected,
    /// No tracking link appeared before the deadline.
    TrackingTimeout,
    /// Upstream reported the article stopped or deleted.
    TrackingTerminated,
    /// Every platform target failed.
    PlatformLaunch,
    Internal,
    /// Marked failed by stuck-state cleanup.
    Stale,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UpstreamRejected => "upstream_rejected",
            ErrorKind::TrackingTimeout => "tracking_timeout",
            ErrorKind::TrackingTerminated => "tracking_terminated",
            ErrorKind::PlatformLaunch => "platform_launch",
            ErrorKind::Internal => "internal",
            ErrorKind::Stale => "stale",
        }
    }
}

/// Failure of one platform target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformErrorEntry {
    pub platform: Platform,
    pub account_id: String,
    pub message: String,
}

/// Structured failure information, overwritten on every failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Status the campaign was in when it failed.
    pub step: CampaignStatus,
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub platform_errors: Vec<PlatformErrorEntry>,
    /// Mirrors [`Campaign::retry_count`]; stamped by the store on read.
    #[serde(default)]
    pub retry_count: u32,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorDetails {
    pub fn new(step: CampaignStatus, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            step,
            kind,
            message: message.into(),
            context: None,
            platform_errors: Vec::new(),
            retry_count: 0,
            occurred_at: Utc::now(),
        }
    }

    /// Attach context, truncated to [`MAX_ERROR_CONTEXT_CHARS`].
    pub fn with_context(mut self, context: impl AsRef<str>) -> Self {
        self.context = Some(truncate_chars(context.as_ref(), MAX_ERROR_CONTEXT_CHARS));
        self
    }

    pub fn with_platform_errors(mut self, errors: Vec<PlatformErrorEntry>) -> Self {
        self.platform_errors = errors;
        self
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// A campaign and its platform targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub manager_id: String,
    pub status: CampaignStatus,
    /// Lower runs first; campaigns without one run after all that have one.
    pub queue_order: Option<i64>,
    pub queued_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub status_changed_at: DateTime<Utc>,
    pub launched_at: Option<DateTime<Utc>>,
    /// Manual retries and resumes so far.
    pub retry_count: u32,
    pub error_details: Option<ErrorDetails>,
    pub offer: Offer,
    pub article_reference: Option<String>,
    pub tracking_link: Option<String>,
    pub creative: Option<CreativeAssets>,
    pub platform_targets: Vec<PlatformTarget>,
}

impl Campaign {
    pub fn target(&self, target_id: &str) -> Option<&PlatformTarget> {
        self.platform_targets.iter().find(|t| t.id == target_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&CampaignStatus::GeneratingAi).unwrap();
        assert_eq!(json, "\"GENERATING_AI\"");
        assert_eq!(CampaignStatus::GeneratingAi.as_str(), "GENERATING_AI");

        let parsed: CampaignStatus = serde_json::from_str("\"AWAITING_TRACKING\"").unwrap();
        assert_eq!(parsed, CampaignStatus::AwaitingTracking);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!(
            "pending_article".parse::<CampaignStatus>().unwrap(),
            CampaignStatus::PendingArticle
        );
        assert!("LAUNCHED".parse::<CampaignStatus>().is_err());
    }

    #[test]
    fn test_processing_set() {
        assert!(!CampaignStatus::Queued.is_processing());
        assert!(CampaignStatus::PendingArticle.is_processing());
        assert!(CampaignStatus::Launching.is_processing());
        assert!(!CampaignStatus::Active.is_processing());
        assert!(!CampaignStatus::Failed.is_processing());

        let terminal: Vec<_> = CampaignStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![CampaignStatus::Active, CampaignStatus::Failed]);
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("TikTok".parse::<Platform>().unwrap(), Platform::Tiktok);
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn test_error_context_truncated() {
        let long = "é".repeat(MAX_ERROR_CONTEXT_CHARS + 50);
        let details = ErrorDetails::new(CampaignStatus::Launching, ErrorKind::Internal, "boom")
            .with_context(&long);
        assert_eq!(
            details.context.unwrap().chars().count(),
            MAX_ERROR_CONTEXT_CHARS
        );
    }

    #[test]
    fn test_error_details_defaults_on_deserialize() {
        let json = r#"{
            "step": "LAUNCHING",
            "kind": "platform_launch",
            "message": "all platforms failed",
            "occurred_at": "2024-05-01T10:00:00Z"
        }"#;
        let details: ErrorDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.kind, ErrorKind::PlatformLaunch);
        assert_eq!(details.retry_count, 0);
        assert!(details.platform_errors.is_empty());
    }

    #[test]
    fn test_budget_mode_default() {
        let target: NewPlatformTarget =
            serde_json::from_str(r#"{"platform":"meta","account_id":"act_1","daily_budget":50.0}"#)
                .unwrap();
        assert_eq!(target.budget_mode, BudgetMode::Cbo);
    }
}
