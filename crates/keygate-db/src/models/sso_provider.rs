//! SSO provider configuration record.

use chrono::{DateTime, Utc};
use keygate_core::ProviderId;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Identity-provider protocols the broker knows how to drive.
///
/// The stored `protocol` column is free text; it is parsed into this enum
/// only when the record is used, so an unknown value is a use-time error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SsoProtocol {
    #[serde(rename = "openid")]
    OpenId,
}

impl SsoProtocol {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenId => "openid",
        }
    }
}

impl Display for SsoProtocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SsoProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openid" => Ok(Self::OpenId),
            other => Err(format!("unsupported protocol: {other}")),
        }
    }
}

/// A stored identity provider configuration.
///
/// Storage allows many rows; by convention the first row in default order
/// (oldest `created_at`) is the one that drives login.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsoProvider {
    pub id: Uuid,
    pub protocol: String,
    pub issuer_address: String,
    pub client_id: String,
    pub client_secret: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied provider settings: everything except id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    pub protocol: String,
    pub issuer_address: String,
    pub client_id: String,
    pub client_secret: String,
    pub enabled: bool,
}

impl SsoProvider {
    /// Build a brand-new record with a fresh id and both timestamps set to `now`.
    #[must_use]
    pub fn new(settings: ProviderSettings, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            protocol: settings.protocol,
            issuer_address: settings.issuer_address,
            client_id: settings.client_id,
            client_secret: settings.client_secret,
            enabled: settings.enabled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the mutable fields, keeping `id` and `created_at`.
    #[must_use]
    pub fn with_settings(&self, settings: ProviderSettings, now: DateTime<Utc>) -> Self {
        Self {
            id: self.id,
            protocol: settings.protocol,
            issuer_address: settings.issuer_address,
            client_id: settings.client_id,
            client_secret: settings.client_secret,
            enabled: settings.enabled,
            created_at: self.created_at,
            updated_at: now,
        }
    }

    /// Get the provider ID as a typed `ProviderId`.
    #[must_use]
    pub fn provider_id(&self) -> ProviderId {
        ProviderId::from_uuid(self.id)
    }

    /// Parse the stored protocol.
    pub fn protocol(&self) -> Result<SsoProtocol, String> {
        self.protocol.parse()
    }
}
