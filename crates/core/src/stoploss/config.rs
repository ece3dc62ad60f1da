use serde::{Deserialize, Serialize};

/// Loss thresholds, in the account currency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopLossConfig {
    /// Net revenue at or below this raises an immediate-loss violation.
    #[serde(default = "default_immediate_loss_threshold")]
    pub immediate_loss_threshold: f64,

    /// Net revenue at or below this, after the horizon, raises a time-based violation.
    #[serde(default = "default_time_based_loss_threshold")]
    pub time_based_loss_threshold: f64,

    /// Hours a campaign must have been live before the time-based rule applies.
    #[serde(default = "default_time_based_horizon_hours")]
    pub time_based_horizon_hours: u64,
}

fn default_immediate_loss_threshold() -> f64 {
    -35.0
}

fn default_time_based_loss_threshold() -> f64 {
    -10.0
}

fn default_time_based_horizon_hours() -> u64 {
    48
}

impl Default for StopLossConfig {
    fn default() -> Self {
        Self {
            immediate_loss_threshold: default_immediate_loss_threshold(),
            time_based_loss_threshold: default_time_based_loss_threshold(),
            time_based_horizon_hours: default_time_based_horizon_hours(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial() {
        let config: StopLossConfig = toml::from_str("immediate_loss_threshold = -50.0").unwrap();
        assert_eq!(config.immediate_loss_threshold, -50.0);
        assert_eq!(config.time_based_loss_threshold, -10.0);
        assert_eq!(config.time_based_horizon_hours, 48);
    }
}
