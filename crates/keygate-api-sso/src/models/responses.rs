//! Response bodies returned by the SSO API.

use keygate_db::models::LocalAccount;
use serde::Serialize;

/// Result of a completed federated login, handed to the session layer.
#[derive(Debug, Clone, Serialize)]
pub struct CallbackResponse {
    pub account: LocalAccount,
    /// Whether the account was provisioned by this login.
    pub created: bool,
}

/// Body of `GET /sso/status`: a bare boolean.
pub type StatusResponse = bool;

/// Body of `POST /sso/test/connect` on success.
#[derive(Debug, Clone, Serialize)]
pub struct TestConnectResponse {
    pub success: bool,
}
