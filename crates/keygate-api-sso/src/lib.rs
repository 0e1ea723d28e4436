//! SSO federation broker for keygate.
//!
//! Lets an operator register one external OpenID Connect identity provider
//! and brokers the browser authorization-code login against it:
//!
//! - [`services::ProviderConfigService`] - provider CRUD, gated by a
//!   connectivity check on every write
//! - [`services::AuthFlowService`] - authorization redirect, code exchange
//!   and userinfo retrieval
//! - [`services::ProvisioningService`] - maps the remote identity onto a
//!   local account, creating one (plus its default role binding) on first
//!   login
//!
//! [`router::create_sso_router`] wires everything behind `/sso`.

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::{SsoError, SsoErrorKind, SsoResult};
pub use router::{create_sso_router, sso_routes, SsoConfig, SsoState};
