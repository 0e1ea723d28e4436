//! Resolves a remote identity to a local account, provisioning on first login.

use std::sync::Arc;

use keygate_core::Language;
use keygate_db::models::{LocalAccount, NewLocalAccount, NewRoleBinding};
use keygate_db::{AccountStore, AccountTransaction, DbError};
use tracing::instrument;

use crate::error::{SsoError, SsoResult};
use crate::models::RemoteIdentity;

/// Outcome of [`ProvisioningService::resolve`].
#[derive(Debug, Clone)]
pub struct ResolvedAccount {
    pub account: LocalAccount,
    /// True when this call created the account.
    pub created: bool,
}

/// Identity resolver and provisioner.
#[derive(Clone)]
pub struct ProvisioningService {
    accounts: Arc<dyn AccountStore>,
}

impl ProvisioningService {
    pub fn new(accounts: Arc<dyn AccountStore>) -> Self {
        Self { accounts }
    }

    /// Find the local account for `identity`, or create it together with
    /// its default role binding.
    ///
    /// A lookup failure other than "not found" is returned as-is. If a
    /// concurrent login creates the same account first, the lookup is run
    /// once more and that account is returned. When the second lookup still
    /// misses, the login name belongs to an unrelated account and
    /// [`SsoError::AccountConflict`] is returned.
    #[instrument(skip(self, identity), fields(email = %identity.email))]
    pub async fn resolve(
        &self,
        identity: &RemoteIdentity,
        language: Language,
    ) -> SsoResult<ResolvedAccount> {
        if let Some(account) = self.lookup(identity).await? {
            tracing::info!(account_id = %account.id, "Federated login matched existing account");
            return Ok(ResolvedAccount {
                account,
                created: false,
            });
        }

        match self.provision(identity, language).await {
            Ok(account) => {
                tracing::info!(
                    account_id = %account.id,
                    "auto-created local account for {}",
                    account.name
                );
                Ok(ResolvedAccount {
                    account,
                    created: true,
                })
            }
            Err(DbError::Conflict(message)) => {
                tracing::info!(
                    conflict = %message,
                    "Account created concurrently, retrying lookup"
                );
                match self.lookup(identity).await? {
                    Some(account) => Ok(ResolvedAccount {
                        account,
                        created: false,
                    }),
                    None => {
                        tracing::warn!(
                            username = %identity.preferred_username,
                            "Federated login name is held by another account"
                        );
                        Err(SsoError::AccountConflict(format!(
                            "login name '{}' is already used by another account",
                            identity.preferred_username
                        )))
                    }
                }
            }
            Err(e) => Err(SsoError::Database(e)),
        }
    }

    async fn lookup(&self, identity: &RemoteIdentity) -> SsoResult<Option<LocalAccount>> {
        Ok(self
            .accounts
            .find_account_by_name_or_email(&identity.email)
            .await?)
    }

    /// Create the account and its binding in one transaction.
    async fn provision(
        &self,
        identity: &RemoteIdentity,
        language: Language,
    ) -> Result<LocalAccount, DbError> {
        let mut tx = self.accounts.begin().await?;

        let created = create_account_with_binding(tx.as_mut(), identity, language).await;
        match created {
            Ok(account) => {
                tx.commit().await?;
                Ok(account)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "Rollback of provisioning transaction failed");
                }
                Err(e)
            }
        }
    }
}

async fn create_account_with_binding(
    tx: &mut dyn AccountTransaction,
    identity: &RemoteIdentity,
    language: Language,
) -> Result<LocalAccount, DbError> {
    let account = tx
        .create_account(NewLocalAccount::federated(
            &identity.preferred_username,
            &identity.email,
            language,
        ))
        .await?;

    tx.create_role_binding(NewRoleBinding::default_for(account.id, &account.name))
        .await?;

    Ok(account)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use keygate_db::models::FEDERATED_CREDENTIAL;
    use crate::error::SsoErrorKind;
    use keygate_db::{DbResult, MemoryStore};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Misses on the first lookup, as if another login had not committed yet.
    struct LateCommitStore {
        inner: MemoryStore,
        missed: AtomicBool,
    }

    #[async_trait]
    impl AccountStore for LateCommitStore {
        async fn find_account_by_name_or_email(&self, key: &str) -> DbResult<Option<LocalAccount>> {
            if !self.missed.swap(true, Ordering::SeqCst) {
                return Ok(None);
            }
            self.inner.find_account_by_name_or_email(key).await
        }

        async fn begin(&self) -> DbResult<Box<dyn AccountTransaction>> {
            self.inner.begin().await
        }
    }

    async fn seed(store: &MemoryStore, name: &str, email: &str) -> LocalAccount {
        let mut tx = store.begin().await.unwrap();
        let account = tx
            .create_account(NewLocalAccount::federated(name, email, Language::EnUs))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        account
    }

    fn identity(email: &str, username: &str) -> RemoteIdentity {
        RemoteIdentity::from_claims(
            json!({"email": email, "preferred_username": username})
                .as_object()
                .cloned()
                .unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_first_login_provisions_account_and_binding() {
        let store = MemoryStore::new();
        let service = ProvisioningService::new(Arc::new(store.clone()));

        let resolved = service
            .resolve(&identity("alice@example.com", "alice"), Language::ZhCn)
            .await
            .unwrap();

        assert!(resolved.created);
        let account = resolved.account;
        assert_eq!(account.name, "alice");
        assert_eq!(account.language, "zh-CN");
        assert_eq!(account.credential, FEDERATED_CREDENTIAL);
        assert!(!account.is_admin);
        assert!(!account.mfa_enabled);
        assert_eq!(store.account_count().await, 1);

        let bindings = store.bindings_for(account.id).await;
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].role_ref, "ReadOnly");
        assert_eq!(bindings[0].subject_name, "alice");
    }

    #[tokio::test]
    async fn test_existing_account_has_no_side_effects() {
        let store = MemoryStore::new();
        let service = ProvisioningService::new(Arc::new(store.clone()));
        let first = service
            .resolve(&identity("bob@example.com", "bob"), Language::EnUs)
            .await
            .unwrap();

        let second = service
            .resolve(&identity("bob@example.com", "bob"), Language::EnUs)
            .await
            .unwrap();

        assert!(!second.created);
        assert_eq!(second.account.id, first.account.id);
        assert_eq!(store.account_count().await, 1);
        assert_eq!(store.binding_count().await, 1);
    }

    #[tokio::test]
    async fn test_lookup_matches_username_equal_to_email() {
        let store = MemoryStore::new();
        let service = ProvisioningService::new(Arc::new(store.clone()));
        service
            .resolve(&identity("carol@example.com", "carol"), Language::EnUs)
            .await
            .unwrap();

        // Another identity whose email equals an existing login name.
        let mut tx = store.begin().await.unwrap();
        tx.create_account(NewLocalAccount::federated(
            "dave@example.com",
            "dave.other@example.com",
            Language::EnUs,
        ))
        .await
        .unwrap();
        tx.commit().await.unwrap();

        let resolved = service
            .resolve(&identity("dave@example.com", "dave"), Language::EnUs)
            .await
            .unwrap();
        assert!(!resolved.created);
        assert_eq!(resolved.account.name, "dave@example.com");
    }

    #[tokio::test]
    async fn test_concurrent_first_login_returns_committed_account() {
        let store = MemoryStore::new();
        let seeded = seed(&store, "alice", "alice@example.com").await;
        let service = ProvisioningService::new(Arc::new(LateCommitStore {
            inner: store.clone(),
            missed: AtomicBool::new(false),
        }));

        let resolved = service
            .resolve(&identity("alice@example.com", "alice"), Language::EnUs)
            .await
            .unwrap();

        assert!(!resolved.created);
        assert_eq!(resolved.account.id, seeded.id);
        assert_eq!(store.account_count().await, 1);
        assert_eq!(store.binding_count().await, 0);
    }

    #[tokio::test]
    async fn test_username_taken_by_other_account_is_conflict() {
        let store = MemoryStore::new();
        seed(&store, "admin", "root@local").await;
        let service = ProvisioningService::new(Arc::new(store.clone()));

        let err = service
            .resolve(&identity("eve@idp.example", "admin"), Language::EnUs)
            .await
            .unwrap_err();

        assert!(matches!(err, SsoError::AccountConflict(_)));
        assert_eq!(err.kind(), SsoErrorKind::Conflict);
        assert!(err.to_string().contains("'admin'"));
        assert_eq!(store.account_count().await, 1);
        assert_eq!(store.binding_count().await, 0);
    }
}
