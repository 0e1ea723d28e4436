//! Business logic services for the SSO broker.

pub mod auth_flow;
pub mod connectivity;
pub mod discovery;
pub mod login_session;
pub mod provider_config;
pub mod provisioning;

pub use auth_flow::{AuthFlowService, AuthorizationRedirect, CallbackInput};
pub use connectivity::{ConnectivityVerifier, OidcConnectivityVerifier};
pub use discovery::{DiscoveredEndpoints, DiscoveryService};
pub use login_session::{LoginSessionStore, NewPendingLogin, PendingLogin};
pub use provider_config::ProviderConfigService;
pub use provisioning::{ProvisioningService, ResolvedAccount};
