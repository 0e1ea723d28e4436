//! PostgreSQL implementation of the store traits.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::models::{LocalAccount, NewLocalAccount, NewRoleBinding, RoleBinding, SsoProvider};
use crate::store::{AccountStore, AccountTransaction, ProviderStore};

/// Store backed by a PostgreSQL connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> DbResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(DbError::ConnectionFailed)?;
        tracing::info!(max_connections, "Database pool connected");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ProviderStore for PgStore {
    async fn insert_provider(&self, provider: &SsoProvider) -> DbResult<SsoProvider> {
        let row = sqlx::query_as::<_, SsoProvider>(
            r"
            INSERT INTO sso_providers
                (id, protocol, issuer_address, client_id, client_secret, enabled, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            ",
        )
        .bind(provider.id)
        .bind(&provider.protocol)
        .bind(&provider.issuer_address)
        .bind(&provider.client_id)
        .bind(&provider.client_secret)
        .bind(provider.enabled)
        .bind(provider.created_at)
        .bind(provider.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_provider(&self, provider: &SsoProvider) -> DbResult<SsoProvider> {
        let row = sqlx::query_as::<_, SsoProvider>(
            r"
            UPDATE sso_providers
            SET protocol = $2,
                issuer_address = $3,
                client_id = $4,
                client_secret = $5,
                enabled = $6,
                updated_at = $7
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(provider.id)
        .bind(&provider.protocol)
        .bind(&provider.issuer_address)
        .bind(&provider.client_id)
        .bind(&provider.client_secret)
        .bind(provider.enabled)
        .bind(provider.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| DbError::NotFound(format!("sso provider {}", provider.id)))
    }

    async fn find_provider(&self, id: Uuid) -> DbResult<Option<SsoProvider>> {
        let row = sqlx::query_as::<_, SsoProvider>("SELECT * FROM sso_providers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_providers(&self) -> DbResult<Vec<SsoProvider>> {
        let rows = sqlx::query_as::<_, SsoProvider>(
            "SELECT * FROM sso_providers ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn find_account_by_name_or_email(&self, key: &str) -> DbResult<Option<LocalAccount>> {
        let row = sqlx::query_as::<_, LocalAccount>(
            r"
            SELECT * FROM local_accounts
            WHERE name = $1 OR email = $1
            ORDER BY created_at ASC
            LIMIT 1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn begin(&self) -> DbResult<Box<dyn AccountTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgAccountTransaction { tx }))
    }
}

/// Provisioning unit of work on a live database transaction.
///
/// `sqlx` rolls the transaction back when it is dropped uncommitted.
pub struct PgAccountTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl AccountTransaction for PgAccountTransaction {
    async fn create_account(&mut self, input: NewLocalAccount) -> DbResult<LocalAccount> {
        let account = input.into_account(Utc::now());
        let row = sqlx::query_as::<_, LocalAccount>(
            r"
            INSERT INTO local_accounts
                (id, name, nick_name, email, language, is_admin, account_type,
                 mfa_enabled, credential, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            ",
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.nick_name)
        .bind(&account.email)
        .bind(&account.language)
        .bind(account.is_admin)
        .bind(&account.account_type)
        .bind(account.mfa_enabled)
        .bind(&account.credential)
        .bind(account.created_at)
        .bind(account.updated_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn create_role_binding(&mut self, input: NewRoleBinding) -> DbResult<RoleBinding> {
        let binding = input.into_binding(Utc::now());
        let row = sqlx::query_as::<_, RoleBinding>(
            r"
            INSERT INTO role_bindings
                (id, name, subject_kind, subject_name, account_id, role_ref, created_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            ",
        )
        .bind(binding.id)
        .bind(&binding.name)
        .bind(&binding.subject_kind)
        .bind(&binding.subject_name)
        .bind(binding.account_id)
        .bind(&binding.role_ref)
        .bind(&binding.created_by)
        .bind(binding.created_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
