//! Error types for the keygate-db crate.
//!
//! Wraps `SQLx` errors and the in-memory store's failures in one type so the
//! services above never depend on which backend is configured.

use thiserror::Error;

/// Result alias for store operations.
pub type DbResult<T> = Result<T, DbError>;

/// Database operation errors.
///
/// # Example
///
/// ```rust
/// use keygate_db::DbError;
///
/// fn handle_error(err: DbError) {
///     match err {
///         DbError::ConnectionFailed(e) => eprintln!("Cannot connect: {}", e),
///         DbError::MigrationFailed(e) => eprintln!("Migration error: {}", e),
///         DbError::QueryFailed(e) => eprintln!("Query error: {}", e),
///         DbError::Conflict(msg) => eprintln!("Conflict: {}", msg),
///         DbError::NotFound(msg) => eprintln!("Not found: {}", msg),
///     }
/// }
/// ```
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// A database query failed to execute.
    #[error("Query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    /// A uniqueness constraint rejected the write.
    ///
    /// Raised when two first-time logins for the same identity race each
    /// other; the loser should re-run its lookup.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The record addressed by an update does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl DbError {
    /// Check if this error indicates a connection problem.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_))
    }

    /// Check if this error is a uniqueness conflict.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, DbError::Conflict(_))
    }

    /// Check if this error indicates a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict(db_err.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DbError::ConnectionFailed(err)
            }
            sqlx::Error::RowNotFound => DbError::NotFound("row not found".to_string()),
            _ => DbError::QueryFailed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_conflict() {
        let err = DbError::Conflict("local_accounts_email_key".to_string());
        assert_eq!(err.to_string(), "Conflict: local_accounts_email_key");
    }

    #[test]
    fn test_is_conflict() {
        let err = DbError::Conflict("dup".to_string());
        assert!(err.is_conflict());
        assert!(!err.is_not_found());
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_pool_timeout_maps_to_connection_error() {
        let err: DbError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_connection_error());
    }
}
