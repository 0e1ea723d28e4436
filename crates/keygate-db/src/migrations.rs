//! Database migrations.

use crate::error::DbError;
use crate::postgres::PgStore;

/// Apply the embedded migrations from `migrations/`.
pub async fn run_migrations(store: &PgStore) -> Result<(), DbError> {
    tracing::info!("Running database migrations...");

    sqlx::migrate!("./migrations")
        .run(store.pool())
        .await
        .map_err(DbError::MigrationFailed)?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
