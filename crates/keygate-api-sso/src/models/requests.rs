//! Request bodies accepted by the SSO API.

use keygate_db::models::ProviderSettings;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::{SsoError, SsoResult};

/// Provider configuration as submitted to create, update and test-connect.
///
/// `id` is ignored on create and required on update; timestamps are never
/// taken from the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRequest {
    #[serde(default)]
    pub id: Option<Uuid>,

    #[validate(length(min = 1, max = 32, message = "Protocol is required"))]
    pub protocol: String,

    #[serde(alias = "interfaceAddress")]
    #[validate(url(message = "Issuer address must be a valid URL"))]
    pub issuer_address: String,

    #[validate(length(min = 1, max = 512, message = "Client ID is required"))]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    #[serde(default, alias = "enable")]
    pub enabled: bool,
}

impl ProviderRequest {
    /// Validate the body and split it into the settings that get persisted.
    pub fn into_settings(self) -> SsoResult<ProviderSettings> {
        self.validate()
            .map_err(|e| SsoError::InvalidConfiguration(e.to_string()))?;
        Ok(self.settings())
    }

    #[must_use]
    pub fn settings(self) -> ProviderSettings {
        ProviderSettings {
            protocol: self.protocol,
            issuer_address: self.issuer_address,
            client_id: self.client_id,
            client_secret: self.client_secret,
            enabled: self.enabled,
        }
    }
}

/// Query parameters the identity provider appends to the callback.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_aliases() {
        let body = serde_json::json!({
            "protocol": "openid",
            "interfaceAddress": "https://idp.example",
            "clientId": "abc",
            "clientSecret": "xyz",
            "enable": true
        });
        let request: ProviderRequest = serde_json::from_value(body).unwrap();
        let settings = request.into_settings().unwrap();
        assert_eq!(settings.issuer_address, "https://idp.example");
        assert!(settings.enabled);
    }

    #[test]
    fn test_rejects_non_url_issuer() {
        let request = ProviderRequest {
            id: None,
            protocol: "openid".into(),
            issuer_address: "not a url".into(),
            client_id: "abc".into(),
            client_secret: "xyz".into(),
            enabled: true,
        };
        assert!(matches!(
            request.into_settings(),
            Err(SsoError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_rejects_empty_client_id() {
        let request = ProviderRequest {
            id: None,
            protocol: "openid".into(),
            issuer_address: "https://idp.example".into(),
            client_id: String::new(),
            client_secret: "xyz".into(),
            enabled: true,
        };
        assert!(request.into_settings().is_err());
    }
}
