//! API Key authentication.

use std::collections::HashMap;

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity, ROLE_ADMIN, ROLE_CLAIM};
use crate::config::ApiKeyEntry;

/// User id of the holder of the single `auth.api_key`.
pub const OPERATOR_USER_ID: &str = "api_key_user";

/// Authenticator that validates requests against configured API keys.
///
/// Each key maps to a manager id; admin keys may act on any manager's data.
///
/// Accepts the key in either:
/// - `Authorization: Bearer <key>` header
/// - `X-API-Key: <key>` header
pub struct ApiKeyAuthenticator {
    keys: Vec<ApiKeyEntry>,
}

impl ApiKeyAuthenticator {
    pub fn new(keys: Vec<ApiKeyEntry>) -> Self {
        Self { keys }
    }

    /// Single operator key, authenticated as an admin.
    pub fn single(api_key: String) -> Self {
        Self::new(vec![ApiKeyEntry {
            key: api_key,
            user_id: OPERATOR_USER_ID.to_string(),
            admin: true,
        }])
    }

    /// Extract API key from request headers.
    /// Checks Authorization: Bearer and X-API-Key headers.
    fn extract_key(&self, request: &AuthRequest) -> Option<String> {
        if let Some(auth_header) = request.headers.get("authorization") {
            if let Some(key) = auth_header
                .strip_prefix("Bearer ")
                .or_else(|| auth_header.strip_prefix("bearer "))
            {
                return Some(key.to_string());
            }
        }

        request.headers.get("x-api-key").cloned()
    }
}

#[async_trait]
impl Authenticator for ApiKeyAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let provided_key = self
            .extract_key(request)
            .ok_or(AuthError::NotAuthenticated)?;

        let entry = self
            .keys
            .iter()
            .find(|entry| constant_time_eq(provided_key.as_bytes(), entry.key.as_bytes()))
            .ok_or_else(|| AuthError::InvalidCredentials("Invalid API key".to_string()))?;

        let mut claims = HashMap::new();
        if entry.admin {
            claims.insert(ROLE_CLAIM.to_string(), serde_json::json!(ROLE_ADMIN));
        }

        Ok(Identity {
            user_id: entry.user_id.clone(),
            method: "api_key".to_string(),
            claims,
        })
    }

    fn method_name(&self) -> &'static str {
        "api_key"
    }
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;

    fn make_request(headers: Vec<(&str, &str)>) -> AuthRequest {
        AuthRequest {
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.to_lowercase(), v.to_string()))
                .collect(),
            source_ip: "127.0.0.1".parse::<IpAddr>().unwrap(),
        }
    }

    fn manager_keys() -> ApiKeyAuthenticator {
        ApiKeyAuthenticator::new(vec![
            ApiKeyEntry {
                key: "alice-key".to_string(),
                user_id: "alice".to_string(),
                admin: false,
            },
            ApiKeyEntry {
                key: "ops-key".to_string(),
                user_id: "ops".to_string(),
                admin: true,
            },
        ])
    }

    #[tokio::test]
    async fn test_bearer_token_valid() {
        let auth = ApiKeyAuthenticator::single("secret-key-123".to_string());
        let request = make_request(vec![("Authorization", "Bearer secret-key-123")]);

        let identity = auth.authenticate(&request).await.unwrap();

        assert_eq!(identity.user_id, "api_key_user");
        assert_eq!(identity.method, "api_key");
        assert!(identity.is_admin());
    }

    #[tokio::test]
    async fn test_x_api_key_header_maps_to_manager() {
        let auth = manager_keys();
        let request = make_request(vec![("X-API-Key", "alice-key")]);

        let identity = auth.authenticate(&request).await.unwrap();

        assert_eq!(identity.user_id, "alice");
        assert!(!identity.is_admin());
    }

    #[tokio::test]
    async fn test_admin_key() {
        let auth = manager_keys();
        let request = make_request(vec![("Authorization", "bearer ops-key")]);

        let identity = auth.authenticate(&request).await.unwrap();
        assert_eq!(identity.user_id, "ops");
        assert!(identity.is_admin());
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let auth = manager_keys();
        let request = make_request(vec![("Authorization", "Bearer wrong-key")]);

        let result = auth.authenticate(&request).await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials(_))));
    }

    #[tokio::test]
    async fn test_missing_header() {
        let auth = manager_keys();
        let request = make_request(vec![]);

        let result = auth.authenticate(&request).await;

        assert!(matches!(result, Err(AuthError::NotAuthenticated)));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"hello", b"hell"));
        assert!(constant_time_eq(b"", b""));
    }
}
