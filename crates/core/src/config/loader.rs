use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Names the TOML file the server reads at startup.
pub const CONFIG_PATH_ENV: &str = "LAUNCHPRO_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

const ENV_PREFIX: &str = "LAUNCHPRO_";

/// Config file location: `$LAUNCHPRO_CONFIG`, else `config.toml` in the
/// working directory.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load the TOML file, then apply `LAUNCHPRO_*` overrides.
///
/// Nested keys are separated by a double underscore, so an operator can
/// tighten a stop-loss rule or swap a platform adapter without editing the
/// file, e.g. `LAUNCHPRO_STOP_LOSS__IMMEDIATE_LOSS_THRESHOLD=-50`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["config"])
                .split("__"),
        )
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse a config without file or environment lookups.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
