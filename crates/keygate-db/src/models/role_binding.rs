//! Role binding entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Role granted to every account provisioned by federation.
pub const DEFAULT_ROLE: &str = "ReadOnly";

/// Binds a subject (an account) to a named role.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
    pub id: Uuid,
    pub name: String,
    pub subject_kind: String,
    pub subject_name: String,
    pub account_id: Uuid,
    pub role_ref: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a role binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRoleBinding {
    pub subject_name: String,
    pub account_id: Uuid,
    pub role_ref: String,
    pub created_by: String,
}

impl NewRoleBinding {
    /// Binding of `account` to [`DEFAULT_ROLE`].
    #[must_use]
    pub fn default_for(account_id: Uuid, username: &str) -> Self {
        Self {
            subject_name: username.to_string(),
            account_id,
            role_ref: DEFAULT_ROLE.to_string(),
            created_by: "admin".to_string(),
        }
    }

    /// Conventional binding name: `role-binding-{role}-{subject}`.
    #[must_use]
    pub fn binding_name(&self) -> String {
        format!("role-binding-{}-{}", self.role_ref, self.subject_name)
    }

    #[must_use]
    pub fn into_binding(self, now: DateTime<Utc>) -> RoleBinding {
        RoleBinding {
            id: Uuid::new_v4(),
            name: self.binding_name(),
            subject_kind: "User".to_string(),
            subject_name: self.subject_name,
            account_id: self.account_id,
            role_ref: self.role_ref,
            created_by: self.created_by,
            created_at: now,
        }
    }
}
