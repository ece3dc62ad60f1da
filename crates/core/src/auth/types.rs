use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Claim carrying the caller's role.
pub const ROLE_CLAIM: &str = "role";
/// Role that may act on any manager's campaigns and violations.
pub const ROLE_ADMIN: &str = "admin";

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// Authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub method: String,
    pub claims: HashMap<String, serde_json::Value>,
}

impl Identity {
    /// Identity used when authentication is disabled. Unauthenticated
    /// deployments are operator-only, so it carries the admin role.
    pub fn anonymous() -> Self {
        let mut claims = HashMap::new();
        claims.insert(ROLE_CLAIM.to_string(), serde_json::json!(ROLE_ADMIN));
        Self {
            user_id: "anonymous".to_string(),
            method: "none".to_string(),
            claims,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.claims
            .get(ROLE_CLAIM)
            .and_then(|v| v.as_str())
            .is_some_and(|role| role == ROLE_ADMIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_identity() {
        let identity = Identity::anonymous();
        assert_eq!(identity.user_id, "anonymous");
        assert_eq!(identity.method, "none");
        assert!(identity.is_admin());
    }

    #[test]
    fn test_identity_without_role_is_not_admin() {
        let identity = Identity {
            user_id: "alice".to_string(),
            method: "api_key".to_string(),
            claims: HashMap::new(),
        };
        assert!(!identity.is_admin());
    }

    #[test]
    fn test_identity_serialization() {
        let identity = Identity {
            user_id: "user123".to_string(),
            method: "api_key".to_string(),
            claims: {
                let mut map = HashMap::new();
                map.insert("email".to_string(), serde_json::json!("user@example.com"));
                map
            },
        };

        let json = serde_json::to_string(&identity).unwrap();
        let deserialized: Identity = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.user_id, "user123");
        assert_eq!(
            deserialized.claims.get("email"),
            Some(&serde_json::json!("user@example.com"))
        );
    }
}
