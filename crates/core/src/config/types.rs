use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::campaign::Platform;
use crate::cleanup::CleanupConfig;
use crate::scheduler::SchedulerConfig;
use crate::stoploss::StopLossConfig;
use crate::tracking::PollerConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub tracking: PollerConfig,
    #[serde(default)]
    pub stop_loss: StopLossConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    /// Content, tracking, creative and performance services.
    #[serde(default)]
    pub upstream: Option<UpstreamConfig>,
    /// One launch adapter per ad platform.
    #[serde(default)]
    pub platforms: Vec<PlatformEndpointConfig>,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Single operator key; the holder is treated as an admin.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Per-manager keys.
    #[serde(default)]
    pub keys: Vec<ApiKeyEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// A key that authenticates as a specific manager.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiKeyEntry {
    pub key: String,
    pub user_id: String,
    #[serde(default)]
    pub admin: bool,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("launchpro.db")
}

/// A JSON-over-HTTP collaborator.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpEndpointConfig {
    /// Base URL (e.g., "http://content-service:8000")
    pub url: String,
    /// Sent as `Authorization: Bearer <key>` when set.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Upstream services the launch pipeline talks to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Content/article submission system.
    pub article: HttpEndpointConfig,
    /// Tracking-link status API. Defaults to the article service.
    #[serde(default)]
    pub tracking: Option<HttpEndpointConfig>,
    /// AI creative generation.
    pub creative: HttpEndpointConfig,
    /// Spend/revenue reporting used by the stop-loss monitor.
    pub performance: HttpEndpointConfig,
}

impl UpstreamConfig {
    pub fn tracking_endpoint(&self) -> &HttpEndpointConfig {
        self.tracking.as_ref().unwrap_or(&self.article)
    }
}

/// Launch adapter for one ad platform.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformEndpointConfig {
    pub platform: Platform,
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Launches upload media, so they get a longer default.
    #[serde(default = "default_launch_timeout")]
    pub timeout_secs: u32,
}

fn default_launch_timeout() -> u32 {
    120
}

impl PlatformEndpointConfig {
    pub fn endpoint(&self) -> HttpEndpointConfig {
        HttpEndpointConfig {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            timeout_secs: self.timeout_secs,
        }
    }
}

/// Stop-loss alert delivery. Without a webhook, alerts are only logged.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AlertsConfig {
    #[serde(default)]
    pub webhook: Option<HttpEndpointConfig>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
    pub tracking: PollerConfig,
    pub stop_loss: StopLossConfig,
    pub cleanup: CleanupConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<SanitizedUpstreamConfig>,
    pub platforms: Vec<SanitizedPlatformConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_webhook: Option<SanitizedEndpointConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub key_count: usize,
}

/// Endpoint with its key hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedEndpointConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&HttpEndpointConfig> for SanitizedEndpointConfig {
    fn from(endpoint: &HttpEndpointConfig) -> Self {
        Self {
            url: endpoint.url.clone(),
            api_key_configured: endpoint
                .api_key
                .as_ref()
                .is_some_and(|key| !key.is_empty()),
            timeout_secs: endpoint.timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUpstreamConfig {
    pub article: SanitizedEndpointConfig,
    pub tracking: SanitizedEndpointConfig,
    pub creative: SanitizedEndpointConfig,
    pub performance: SanitizedEndpointConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPlatformConfig {
    pub platform: Platform,
    #[serde(flatten)]
    pub endpoint: SanitizedEndpointConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let key_count =
            config.auth.keys.len() + usize::from(config.auth.api_key.is_some());

        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                key_count,
            },
            server: config.server.clone(),
            database: config.database.clone(),
            scheduler: config.scheduler.clone(),
            tracking: config.tracking.clone(),
            stop_loss: config.stop_loss.clone(),
            cleanup: config.cleanup.clone(),
            upstream: config.upstream.as_ref().map(|u| SanitizedUpstreamConfig {
                article: (&u.article).into(),
                tracking: u.tracking_endpoint().into(),
                creative: (&u.creative).into(),
                performance: (&u.performance).into(),
            }),
            platforms: config
                .platforms
                .iter()
                .map(|p| SanitizedPlatformConfig {
                    platform: p.platform,
                    endpoint: (&p.endpoint()).into(),
                })
                .collect(),
            alert_webhook: config.alerts.webhook.as_ref().map(Into::into),
        }
    }
}
