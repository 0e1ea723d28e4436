//! Storage traits the broker depends on.
//!
//! The provisioning path needs "create account + create role binding" to be
//! all-or-nothing, so account writes go through an explicit unit of work
//! ([`AccountTransaction`]) rather than individual calls.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::{LocalAccount, NewLocalAccount, NewRoleBinding, RoleBinding, SsoProvider};

/// Persistence for SSO provider configuration records.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    /// Insert a new record.
    async fn insert_provider(&self, provider: &SsoProvider) -> DbResult<SsoProvider>;

    /// Overwrite an existing record in one atomic write.
    ///
    /// Fails with [`DbError::NotFound`](crate::DbError::NotFound) when no row
    /// carries `provider.id`.
    async fn update_provider(&self, provider: &SsoProvider) -> DbResult<SsoProvider>;

    async fn find_provider(&self, id: Uuid) -> DbResult<Option<SsoProvider>>;

    /// All records, oldest first (ties broken by id).
    async fn list_providers(&self) -> DbResult<Vec<SsoProvider>>;
}

/// Read access to local accounts plus the provisioning unit of work.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Find an account whose name or email equals `key`.
    async fn find_account_by_name_or_email(&self, key: &str) -> DbResult<Option<LocalAccount>>;

    /// Open a transaction for account provisioning.
    async fn begin(&self) -> DbResult<Box<dyn AccountTransaction>>;
}

/// A single unit of work over accounts and role bindings.
///
/// Dropping a transaction without calling [`commit`](Self::commit) discards
/// every write made through it.
#[async_trait]
pub trait AccountTransaction: Send {
    /// Create an account. Fails with `Conflict` on a duplicate name or email.
    async fn create_account(&mut self, input: NewLocalAccount) -> DbResult<LocalAccount>;

    async fn create_role_binding(&mut self, input: NewRoleBinding) -> DbResult<RoleBinding>;

    async fn commit(self: Box<Self>) -> DbResult<()>;

    async fn rollback(self: Box<Self>) -> DbResult<()>;
}
