use std::collections::HashSet;

use super::{types::Config, AuthMethod, ConfigError};

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(msg.into())
}

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde) and api_key auth has at least one key
/// - Server port is not 0
/// - Scheduler and polling intervals are positive
/// - Stop-loss thresholds are losses, with the time-based one above the immediate one
/// - Cleanup retry cap is at least 1
/// - Each platform has at most one launch adapter
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }

    if config.auth.method == AuthMethod::ApiKey
        && config.auth.api_key.is_none()
        && config.auth.keys.is_empty()
    {
        return Err(invalid(
            "auth.api_key or auth.keys must be set when method = \"api_key\"",
        ));
    }

    let scheduler = &config.scheduler;
    if scheduler.queue_interval_secs == 0
        || scheduler.stop_loss_interval_secs == 0
        || scheduler.cleanup_interval_secs == 0
    {
        return Err(invalid("scheduler intervals must be greater than 0"));
    }

    let tracking = &config.tracking;
    if tracking.max_wait_minutes == 0 {
        return Err(invalid("tracking.max_wait_minutes must be greater than 0"));
    }
    if tracking.polling_interval_seconds == 0 {
        return Err(invalid(
            "tracking.polling_interval_seconds must be greater than 0",
        ));
    }

    let stop_loss = &config.stop_loss;
    if stop_loss.immediate_loss_threshold >= 0.0 || stop_loss.time_based_loss_threshold >= 0.0 {
        return Err(invalid("stop_loss thresholds must be negative"));
    }
    if stop_loss.time_based_loss_threshold <= stop_loss.immediate_loss_threshold {
        return Err(invalid(
            "stop_loss.time_based_loss_threshold must be above stop_loss.immediate_loss_threshold",
        ));
    }
    if stop_loss.time_based_horizon_hours == 0 {
        return Err(invalid(
            "stop_loss.time_based_horizon_hours must be greater than 0",
        ));
    }

    if config.cleanup.max_retry_count == 0 {
        return Err(invalid("cleanup.max_retry_count must be at least 1"));
    }
    if config.cleanup.stale_after_minutes == 0 {
        return Err(invalid("cleanup.stale_after_minutes must be greater than 0"));
    }

    let mut seen = HashSet::new();
    for platform in &config.platforms {
        if platform.url.is_empty() {
            return Err(invalid(format!(
                "platforms.{}: url cannot be empty",
                platform.platform
            )));
        }
        if !seen.insert(platform.platform) {
            return Err(invalid(format!(
                "platform {} is configured more than once",
                platform.platform
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn base_config() -> Config {
        load_config_from_str(
            r#"
[auth]
method = "none"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&base_config()).is_ok());
    }

    #[test]
    fn test_validate_port_zero_fails() {
        let mut config = base_config();
        config.server.port = 0;
        let result = validate_config(&config);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_validate_api_key_without_keys_fails() {
        let mut config = base_config();
        config.auth.method = AuthMethod::ApiKey;
        assert!(validate_config(&config).is_err());

        config.auth.api_key = Some("operator".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_zero_polling_interval_fails() {
        let mut config = base_config();
        config.tracking.polling_interval_seconds = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_positive_threshold_fails() {
        let mut config = base_config();
        config.stop_loss.immediate_loss_threshold = 5.0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_threshold_ordering() {
        let mut config = base_config();
        config.stop_loss.time_based_loss_threshold = -50.0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("time_based_loss_threshold"));
    }

    #[test]
    fn test_validate_zero_retry_cap_fails() {
        let mut config = base_config();
        config.cleanup.max_retry_count = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_duplicate_platform_fails() {
        let config = load_config_from_str(
            r#"
[auth]
method = "none"

[[platforms]]
platform = "meta"
url = "http://a"

[[platforms]]
platform = "meta"
url = "http://b"
"#,
        )
        .unwrap();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }
}
