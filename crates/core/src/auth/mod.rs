//! Caller identification for the campaign API.
//!
//! Every request resolves to an [`Identity`] whose `user_id` is the
//! campaign manager it acts for. Admin identities may act on any manager's
//! campaigns and stop-loss violations.

mod api_key;
mod types;

pub use api_key::*;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{ApiKeyEntry, AuthConfig, AuthMethod};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    NotAuthenticated,

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

/// Resolves the caller of an API request to the manager it acts for.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Reported by `GET /config`.
    fn method_name(&self) -> &'static str;
}

/// Trusted-network deployment: every caller is the anonymous operator,
/// who may manage all campaigns. Only selected by an explicit
/// `auth.method = "none"`.
pub struct OpenAccessAuthenticator;

#[async_trait]
impl Authenticator for OpenAccessAuthenticator {
    async fn authenticate(&self, _request: &AuthRequest) -> Result<Identity, AuthError> {
        Ok(Identity::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}

/// Builds the authenticator for `[auth]`. The legacy single `api_key`
/// becomes an admin key next to the per-manager `keys`.
pub fn create_authenticator(config: &AuthConfig) -> Result<Box<dyn Authenticator>, AuthError> {
    match config.method {
        AuthMethod::None => Ok(Box::new(OpenAccessAuthenticator)),
        AuthMethod::ApiKey => {
            let mut keys = config.keys.clone();
            if let Some(api_key) = &config.api_key {
                keys.push(ApiKeyEntry {
                    key: api_key.clone(),
                    user_id: OPERATOR_USER_ID.to_string(),
                    admin: true,
                });
            }
            if keys.is_empty() {
                return Err(AuthError::ConfigurationError(
                    "api_key or keys must be set when using ApiKey auth method".to_string(),
                ));
            }
            Ok(Box::new(ApiKeyAuthenticator::new(keys)))
        }
    }
}
