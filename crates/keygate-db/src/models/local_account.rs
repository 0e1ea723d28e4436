//! Local account entity model.
//!
//! Accounts are owned by the user-management side of the platform; the
//! broker only looks them up and, on a first federated login, creates one.

use chrono::{DateTime, Utc};
use keygate_core::Language;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Credential stored on accounts created by federation.
///
/// Not a password hash, so no password verifier will ever accept it; the
/// account can only be entered through the identity provider.
pub const FEDERATED_CREDENTIAL: &str = "!federated";

/// How an account authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Authenticated by the platform itself.
    Local,
}

impl AccountType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
        }
    }
}

/// A local user account.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAccount {
    pub id: Uuid,
    /// Login name, unique.
    pub name: String,
    pub nick_name: String,
    /// Email address, unique.
    pub email: String,
    pub language: String,
    pub is_admin: bool,
    pub account_type: String,
    pub mfa_enabled: bool,
    #[serde(skip_serializing, default)]
    pub credential: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocalAccount {
    /// Whether `key` identifies this account by name or by email.
    #[must_use]
    pub fn matches_name_or_email(&self, key: &str) -> bool {
        self.name == key || self.email == key
    }
}

/// Input for creating a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLocalAccount {
    pub name: String,
    pub nick_name: String,
    pub email: String,
    pub language: Language,
    pub is_admin: bool,
    pub account_type: AccountType,
    pub mfa_enabled: bool,
    pub credential: String,
}

impl NewLocalAccount {
    /// Seed for an account provisioned from a federated identity: not an
    /// admin, MFA off, local type, placeholder credential.
    #[must_use]
    pub fn federated(username: &str, email: &str, language: Language) -> Self {
        Self {
            name: username.to_string(),
            nick_name: username.to_string(),
            email: email.to_string(),
            language,
            is_admin: false,
            account_type: AccountType::Local,
            mfa_enabled: false,
            credential: FEDERATED_CREDENTIAL.to_string(),
        }
    }

    /// Materialize the row this input describes.
    #[must_use]
    pub fn into_account(self, now: DateTime<Utc>) -> LocalAccount {
        LocalAccount {
            id: Uuid::new_v4(),
            name: self.name,
            nick_name: self.nick_name,
            email: self.email,
            language: self.language.as_str().to_string(),
            is_admin: self.is_admin,
            account_type: self.account_type.as_str().to_string(),
            mfa_enabled: self.mfa_enabled,
            credential: self.credential,
            created_at: now,
            updated_at: now,
        }
    }
}
