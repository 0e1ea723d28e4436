//! In-memory implementation of the store traits.
//!
//! Suitable for single-node deployments without a database and for tests.
//! Account transactions stage their writes locally and only publish them on
//! commit, after re-checking uniqueness under the write lock.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{LocalAccount, NewLocalAccount, NewRoleBinding, RoleBinding, SsoProvider};
use crate::store::{AccountStore, AccountTransaction, ProviderStore};

#[derive(Debug, Default)]
struct Tables {
    providers: Vec<SsoProvider>,
    accounts: Vec<LocalAccount>,
    bindings: Vec<RoleBinding>,
}

impl Tables {
    fn account_conflict(&self, account: &LocalAccount) -> Option<String> {
        self.accounts
            .iter()
            .find_map(|existing| duplicate_field(existing, account))
    }
}

fn duplicate_field(existing: &LocalAccount, candidate: &LocalAccount) -> Option<String> {
    if existing.name == candidate.name {
        Some(format!("account name '{}' already exists", candidate.name))
    } else if existing.email == candidate.email {
        Some(format!("account email '{}' already exists", candidate.email))
    } else {
        None
    }
}

/// Shared in-memory store. Cloning shares the underlying tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn provider_count(&self) -> usize {
        self.tables.read().await.providers.len()
    }

    pub async fn account_count(&self) -> usize {
        self.tables.read().await.accounts.len()
    }

    pub async fn binding_count(&self) -> usize {
        self.tables.read().await.bindings.len()
    }

    /// Bindings attached to `account_id`.
    pub async fn bindings_for(&self, account_id: Uuid) -> Vec<RoleBinding> {
        self.tables
            .read()
            .await
            .bindings
            .iter()
            .filter(|b| b.account_id == account_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ProviderStore for MemoryStore {
    async fn insert_provider(&self, provider: &SsoProvider) -> DbResult<SsoProvider> {
        let mut tables = self.tables.write().await;
        if tables.providers.iter().any(|p| p.id == provider.id) {
            return Err(DbError::Conflict(format!(
                "sso provider {} already exists",
                provider.id
            )));
        }
        tables.providers.push(provider.clone());
        Ok(provider.clone())
    }

    async fn update_provider(&self, provider: &SsoProvider) -> DbResult<SsoProvider> {
        let mut tables = self.tables.write().await;
        let slot = tables
            .providers
            .iter_mut()
            .find(|p| p.id == provider.id)
            .ok_or_else(|| DbError::NotFound(format!("sso provider {}", provider.id)))?;
        *slot = provider.clone();
        Ok(provider.clone())
    }

    async fn find_provider(&self, id: Uuid) -> DbResult<Option<SsoProvider>> {
        let tables = self.tables.read().await;
        Ok(tables.providers.iter().find(|p| p.id == id).cloned())
    }

    async fn list_providers(&self) -> DbResult<Vec<SsoProvider>> {
        let mut providers = self.tables.read().await.providers.clone();
        providers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(providers)
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn find_account_by_name_or_email(&self, key: &str) -> DbResult<Option<LocalAccount>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .iter()
            .find(|a| a.matches_name_or_email(key))
            .cloned())
    }

    async fn begin(&self) -> DbResult<Box<dyn AccountTransaction>> {
        Ok(Box::new(MemoryAccountTransaction {
            tables: Arc::clone(&self.tables),
            accounts: Vec::new(),
            bindings: Vec::new(),
        }))
    }
}

/// Staged writes against a [`MemoryStore`].
pub struct MemoryAccountTransaction {
    tables: Arc<RwLock<Tables>>,
    accounts: Vec<LocalAccount>,
    bindings: Vec<RoleBinding>,
}

#[async_trait]
impl AccountTransaction for MemoryAccountTransaction {
    async fn create_account(&mut self, input: NewLocalAccount) -> DbResult<LocalAccount> {
        let account = input.into_account(Utc::now());

        if let Some(message) = self.tables.read().await.account_conflict(&account) {
            return Err(DbError::Conflict(message));
        }
        if let Some(message) = self
            .accounts
            .iter()
            .find_map(|staged| duplicate_field(staged, &account))
        {
            return Err(DbError::Conflict(message));
        }

        self.accounts.push(account.clone());
        Ok(account)
    }

    async fn create_role_binding(&mut self, input: NewRoleBinding) -> DbResult<RoleBinding> {
        let known_account = self.accounts.iter().any(|a| a.id == input.account_id)
            || self
                .tables
                .read()
                .await
                .accounts
                .iter()
                .any(|a| a.id == input.account_id);
        if !known_account {
            return Err(DbError::NotFound(format!("account {}", input.account_id)));
        }

        let binding = input.into_binding(Utc::now());
        self.bindings.push(binding.clone());
        Ok(binding)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        let Self {
            tables,
            accounts,
            bindings,
        } = *self;
        let mut tables = tables.write().await;

        // Another transaction may have committed since the staged checks ran.
        for account in &accounts {
            if let Some(message) = tables.account_conflict(account) {
                return Err(DbError::Conflict(message));
            }
        }

        tables.accounts.extend(accounts);
        tables.bindings.extend(bindings);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        Ok(())
    }
}
