//! Stuck-state cleanup.
//!
//! A campaign that sits in a processing status for too long holds the
//! launch slot and blocks the whole queue. Cleanup fails the ones that can
//! never finish and leaves the rest for an operator to resume.

mod runner;

pub use runner::{CleanupReport, StuckStateCleanup};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::campaign::CampaignError;

#[derive(Debug, Error)]
pub enum CleanupError {
    #[error("campaign store error: {0}")]
    Store(#[from] CampaignError),
}

/// Staleness and retry limits for cleanup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupConfig {
    /// A processing campaign whose status has not changed for this long is stale.
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: u64,

    /// Stale campaigns retried this many times are failed.
    #[serde(default = "default_max_retry_count")]
    pub max_retry_count: u32,
}

fn default_stale_after_minutes() -> u64 {
    30
}

fn default_max_retry_count() -> u32 {
    2
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            stale_after_minutes: default_stale_after_minutes(),
            max_retry_count: default_max_retry_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CleanupConfig::default();
        assert_eq!(config.stale_after_minutes, 30);
        assert_eq!(config.max_retry_count, 2);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CleanupConfig = toml::from_str("max_retry_count = 5").unwrap();
        assert_eq!(config.max_retry_count, 5);
        assert_eq!(config.stale_after_minutes, 30);
    }
}
