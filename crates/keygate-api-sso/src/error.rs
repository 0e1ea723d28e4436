//! Error types for the SSO broker.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use keygate_db::DbError;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Result type for SSO operations.
pub type SsoResult<T> = Result<T, SsoError>;

/// Coarse classification of [`SsoError`], used by callers that only care
/// which leg of the system failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsoErrorKind {
    ConfigValidation,
    Protocol,
    NotFound,
    Persistence,
    Conflict,
    UnsupportedProtocol,
    Session,
    Request,
    Internal,
}

/// SSO error types.
#[derive(Debug, Error)]
pub enum SsoError {
    // Configuration errors
    #[error("Invalid SSO configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Discovery failed for issuer {issuer}: {message}")]
    DiscoveryFailed { issuer: String, message: String },

    #[error("Unsupported protocol: {0}")]
    UnsupportedProtocol(String),

    #[error("No SSO provider is configured")]
    NoProviderConfigured,

    #[error("SSO provider not found: {0}")]
    ProviderNotFound(Uuid),

    #[error("SSO provider is disabled: {0}")]
    ProviderDisabled(Uuid),

    // Protocol errors
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Failed to fetch user info: {0}")]
    UserInfoFailed(String),

    #[error("Required claim missing: {0}")]
    RequiredClaimMissing(String),

    // Login session errors
    #[error("Login session not found")]
    LoginSessionNotFound,

    #[error("Login session has expired")]
    LoginSessionExpired,

    #[error("Invalid state parameter")]
    InvalidState,

    // Request errors
    #[error("IdP returned error: {error}")]
    IdpError {
        error: String,
        description: Option<String>,
    },

    #[error("Invalid callback: {0}")]
    InvalidCallback(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Account conflict: {0}")]
    AccountConflict(String),

    // Infrastructure errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl SsoError {
    #[must_use]
    pub fn kind(&self) -> SsoErrorKind {
        match self {
            Self::InvalidConfiguration(_) | Self::DiscoveryFailed { .. } => {
                SsoErrorKind::ConfigValidation
            }
            Self::UnsupportedProtocol(_) => SsoErrorKind::UnsupportedProtocol,
            Self::NoProviderConfigured | Self::ProviderNotFound(_) => SsoErrorKind::NotFound,
            Self::ProviderDisabled(_) => SsoErrorKind::ConfigValidation,
            Self::TokenExchangeFailed(_)
            | Self::UserInfoFailed(_)
            | Self::RequiredClaimMissing(_) => SsoErrorKind::Protocol,
            Self::LoginSessionNotFound | Self::LoginSessionExpired | Self::InvalidState => {
                SsoErrorKind::Session
            }
            Self::IdpError { .. } | Self::InvalidCallback(_) | Self::InvalidRequest(_) => {
                SsoErrorKind::Request
            }
            Self::AccountConflict(_) => SsoErrorKind::Conflict,
            Self::Database(_) => SsoErrorKind::Persistence,
            Self::Internal(_) => SsoErrorKind::Internal,
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for SsoError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            // 400 Bad Request
            SsoError::InvalidConfiguration(msg) => (
                StatusCode::BAD_REQUEST,
                "invalid_configuration",
                msg.clone(),
            ),
            SsoError::InvalidState => (
                StatusCode::BAD_REQUEST,
                "invalid_state",
                "Invalid state parameter".to_string(),
            ),
            SsoError::IdpError { error, description } => {
                tracing::warn!(
                    idp_error = %error,
                    idp_error_description = ?description,
                    "Identity provider reported an error on callback"
                );
                (
                    StatusCode::BAD_REQUEST,
                    "idp_error",
                    "Authentication failed at the identity provider".to_string(),
                )
            }
            SsoError::InvalidCallback(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_callback", msg.clone())
            }
            SsoError::InvalidRequest(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_request", msg.clone())
            }

            // 401 Unauthorized
            SsoError::LoginSessionNotFound => (
                StatusCode::UNAUTHORIZED,
                "login_session_not_found",
                "Login session not found; start the login again".to_string(),
            ),
            SsoError::LoginSessionExpired => (
                StatusCode::UNAUTHORIZED,
                "login_session_expired",
                "Login session has expired; start the login again".to_string(),
            ),

            // 403 Forbidden
            SsoError::ProviderDisabled(_) => (
                StatusCode::FORBIDDEN,
                "provider_disabled",
                "SSO login is disabled".to_string(),
            ),

            // 404 Not Found
            SsoError::ProviderNotFound(id) => (
                StatusCode::NOT_FOUND,
                "provider_not_found",
                format!("SSO provider not found: {id}"),
            ),

            // 409 Conflict
            SsoError::AccountConflict(msg) => {
                (StatusCode::CONFLICT, "account_conflict", msg.clone())
            }

            // 422 Unprocessable Entity
            SsoError::DiscoveryFailed { issuer, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "discovery_failed",
                format!("Discovery failed for issuer {issuer}: {message}"),
            ),
            SsoError::TokenExchangeFailed(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "token_exchange_failed",
                format!("Token exchange failed: {msg}"),
            ),
            SsoError::UserInfoFailed(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "userinfo_failed",
                format!("Failed to fetch user info: {msg}"),
            ),
            SsoError::RequiredClaimMissing(claim) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "required_claim_missing",
                format!("Required claim missing: {claim}"),
            ),

            // 500 Internal Server Error
            SsoError::NoProviderConfigured => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "provider_not_configured",
                "No SSO provider is configured".to_string(),
            ),
            SsoError::UnsupportedProtocol(protocol) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "unsupported_protocol",
                format!("Unsupported protocol: {protocol}"),
            ),
            SsoError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "database_error",
                    "A database error occurred".to_string(),
                )
            }
            SsoError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            SsoError::DiscoveryFailed {
                issuer: "https://idp.example".into(),
                message: "boom".into()
            }
            .kind(),
            SsoErrorKind::ConfigValidation
        );
        assert_eq!(
            SsoError::TokenExchangeFailed("x".into()).kind(),
            SsoErrorKind::Protocol
        );
        assert_eq!(
            SsoError::UserInfoFailed("x".into()).kind(),
            SsoErrorKind::Protocol
        );
        assert_eq!(
            SsoError::UnsupportedProtocol("saml".into()).kind(),
            SsoErrorKind::UnsupportedProtocol
        );
        assert_eq!(
            SsoError::Database(DbError::Conflict("dup".into())).kind(),
            SsoErrorKind::Persistence
        );
        assert_eq!(SsoError::NoProviderConfigured.kind(), SsoErrorKind::NotFound);
    }

    #[test]
    fn test_status_codes() {
        let cases = [
            (
                SsoError::InvalidConfiguration("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                SsoError::DiscoveryFailed {
                    issuer: "i".into(),
                    message: "m".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                SsoError::TokenExchangeFailed("t".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                SsoError::NoProviderConfigured,
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SsoError::UnsupportedProtocol("saml".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SsoError::ProviderNotFound(Uuid::new_v4()),
                StatusCode::NOT_FOUND,
            ),
            (SsoError::LoginSessionExpired, StatusCode::UNAUTHORIZED),
            (
                SsoError::AccountConflict("login name 'admin'".into()),
                StatusCode::CONFLICT,
            ),
            (SsoError::InvalidState, StatusCode::BAD_REQUEST),
            (
                SsoError::ProviderDisabled(Uuid::new_v4()),
                StatusCode::FORBIDDEN,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_display_distinguishes_protocol_legs() {
        assert!(SsoError::TokenExchangeFailed("x".into())
            .to_string()
            .starts_with("Token exchange failed"));
        assert!(SsoError::UserInfoFailed("x".into())
            .to_string()
            .starts_with("Failed to fetch user info"));
    }
}
