//! Request, response and identity models for the SSO API.

pub mod identity;
pub mod requests;
pub mod responses;

pub use identity::RemoteIdentity;
pub use requests::{CallbackParams, ProviderRequest};
pub use responses::{CallbackResponse, StatusResponse, TestConnectResponse};
