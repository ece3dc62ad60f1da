//! Tracking-link acquisition.
//!
//! After an article is accepted the upstream system needs minutes to review
//! it and mint a tracking link. [`TrackingLinkPoller`] watches the article's
//! status through a [`TrackingStatusSource`] until a link shows up, the
//! article is terminated, or the deadline passes.

mod config;
mod http;
mod poller;

pub use config::PollerConfig;
pub use http::HttpTrackingStatusSource;
pub use poller::{PollOutcome, PollProgress, TrackingLinkPoller};

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::http_client::HttpCallError;

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("tracking service error: {0}")]
    Http(#[from] HttpCallError),

    #[error("invalid tracking response: {0}")]
    InvalidResponse(String),
}

/// Article status as reported upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamStatus {
    Active,
    Pending,
    Incomplete,
    Stopped,
    Deleted,
    /// Anything else; treated like `Pending`.
    Unknown(String),
}

impl UpstreamStatus {
    /// Parse an upstream status string, case-insensitively.
    pub fn from_upstream(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => UpstreamStatus::Active,
            "pending" => UpstreamStatus::Pending,
            "incomplete" => UpstreamStatus::Incomplete,
            "stopped" => UpstreamStatus::Stopped,
            "deleted" => UpstreamStatus::Deleted,
            _ => UpstreamStatus::Unknown(raw.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            UpstreamStatus::Active => "active",
            UpstreamStatus::Pending => "pending",
            UpstreamStatus::Incomplete => "incomplete",
            UpstreamStatus::Stopped => "stopped",
            UpstreamStatus::Deleted => "deleted",
            UpstreamStatus::Unknown(raw) => raw,
        }
    }

    /// The article will never produce a link.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UpstreamStatus::Stopped | UpstreamStatus::Deleted)
    }
}

impl fmt::Display for UpstreamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for UpstreamStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UpstreamStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(UpstreamStatus::from_upstream(&raw))
    }
}

/// One observation of an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: UpstreamStatus,
    #[serde(default)]
    pub tracking_link: Option<String>,
}

impl StatusReport {
    /// The tracking link, if upstream reported a non-blank one.
    pub fn link(&self) -> Option<&str> {
        self.tracking_link
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }

    /// Active with a usable link.
    pub fn is_ready(&self) -> bool {
        self.status == UpstreamStatus::Active && self.link().is_some()
    }
}

#[async_trait]
pub trait TrackingStatusSource: Send + Sync {
    async fn query(&self, reference_id: &str) -> Result<StatusReport, TrackingError>;
}
