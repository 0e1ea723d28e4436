//! Identity asserted by the remote provider.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{SsoError, SsoResult};

/// Claims returned by the provider's userinfo endpoint.
///
/// Never persisted; produced by the login flow and consumed once by the
/// provisioning service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteIdentity {
    pub email: String,
    pub preferred_username: String,
    pub claims: Map<String, Value>,
}

impl RemoteIdentity {
    /// Build an identity from a raw claim set.
    ///
    /// `email` is mandatory. An absent or blank `preferred_username` falls
    /// back to the email.
    pub fn from_claims(claims: Map<String, Value>) -> SsoResult<Self> {
        let email = claims
            .get("email")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SsoError::RequiredClaimMissing("email".to_string()))?
            .to_string();

        let preferred_username = claims
            .get("preferred_username")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map_or_else(|| email.clone(), str::to_string);

        Ok(Self {
            email,
            preferred_username,
            claims,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_extracts_email_and_username() {
        let identity = RemoteIdentity::from_claims(map(json!({
            "sub": "123",
            "email": "alice@example.com",
            "preferred_username": "alice"
        })))
        .unwrap();
        assert_eq!(identity.email, "alice@example.com");
        assert_eq!(identity.preferred_username, "alice");
        assert_eq!(identity.claims["sub"], "123");
    }

    #[test]
    fn test_username_falls_back_to_email() {
        let identity = RemoteIdentity::from_claims(map(json!({
            "email": "bob@example.com",
            "preferred_username": ""
        })))
        .unwrap();
        assert_eq!(identity.preferred_username, "bob@example.com");
    }

    #[test]
    fn test_missing_email_is_rejected() {
        let err = RemoteIdentity::from_claims(map(json!({"sub": "1"}))).unwrap_err();
        assert!(matches!(err, SsoError::RequiredClaimMissing(claim) if claim == "email"));
    }
}
