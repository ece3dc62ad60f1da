use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tracking-link polling limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Give up this long after the first query.
    #[serde(default = "default_max_wait_minutes")]
    pub max_wait_minutes: u64,

    /// Pause between queries.
    #[serde(default = "default_polling_interval_seconds")]
    pub polling_interval_seconds: u64,
}

fn default_max_wait_minutes() -> u64 {
    15
}

fn default_polling_interval_seconds() -> u64 {
    30
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            max_wait_minutes: default_max_wait_minutes(),
            polling_interval_seconds: default_polling_interval_seconds(),
        }
    }
}

impl PollerConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_minutes * 60)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PollerConfig::default();
        assert_eq!(config.max_wait(), Duration::from_secs(900));
        assert_eq!(config.polling_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: PollerConfig = toml::from_str("max_wait_minutes = 5").unwrap();
        assert_eq!(config.max_wait_minutes, 5);
        assert_eq!(config.polling_interval_seconds, 30);
    }
}
