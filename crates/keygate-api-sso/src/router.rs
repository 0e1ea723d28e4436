//! Router for the SSO API.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use keygate_db::{AccountStore, ProviderStore};

use crate::error::SsoResult;
use crate::handlers::{admin, login};
use crate::services::{
    AuthFlowService, DiscoveryService, LoginSessionStore, OidcConnectivityVerifier,
    ProviderConfigService, ProvisioningService,
};

/// Shared state for SSO handlers.
#[derive(Clone)]
pub struct SsoState {
    /// Provider configuration service.
    pub provider_config: ProviderConfigService,
    /// Auth flow service.
    pub auth_flow: AuthFlowService,
    /// Provisioning service.
    pub provisioning: ProvisioningService,
    /// Lifetime of a pending login, also used as the cookie max-age.
    pub login_session_ttl: Duration,
}

/// Configuration for the SSO router.
#[derive(Clone)]
pub struct SsoConfig {
    pub provider_store: Arc<dyn ProviderStore>,
    pub account_store: Arc<dyn AccountStore>,
    /// Accept `http://` and private-network issuers. Development and tests only.
    pub allow_insecure_issuers: bool,
    /// Timeout applied to every outbound request to the identity provider.
    pub http_timeout: Duration,
    pub login_session_ttl: Duration,
}

impl SsoState {
    /// Create the SSO state.
    pub fn new(config: &SsoConfig) -> SsoResult<Self> {
        let discovery = DiscoveryService::new(config.allow_insecure_issuers, config.http_timeout)?;
        let verifier = Arc::new(OidcConnectivityVerifier::new(discovery.clone()));
        let provider_config = ProviderConfigService::new(config.provider_store.clone(), verifier);
        let sessions = LoginSessionStore::new(config.login_session_ttl);
        let auth_flow = AuthFlowService::new(provider_config.clone(), discovery, sessions);
        let provisioning = ProvisioningService::new(config.account_store.clone());

        Ok(Self {
            provider_config,
            auth_flow,
            provisioning,
            login_session_ttl: config.login_session_ttl,
        })
    }
}

/// SSO routes.
///
/// Routes:
/// - GET /sso/ - List provider configurations
/// - POST /sso/ - Create provider configuration
/// - PUT /sso/ - Update provider configuration
/// - GET /sso/login - Redirect to the identity provider
/// - GET /sso/callback - Complete login, resolve the local account
/// - POST /sso/test/connect - Connectivity check only
/// - GET /sso/status - Whether SSO login is offered
pub fn sso_routes() -> Router<SsoState> {
    let providers = get(admin::list_providers)
        .post(admin::create_provider)
        .put(admin::update_provider);

    Router::new()
        .route("/sso", providers.clone())
        .route("/sso/", providers)
        .route("/sso/login", get(login::login))
        .route("/sso/callback", get(login::callback))
        .route("/sso/test/connect", post(admin::test_connect))
        .route("/sso/status", get(admin::status))
}

/// Create the full SSO router.
pub fn create_sso_router(state: SsoState) -> Router {
    sso_routes().with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use keygate_db::MemoryStore;

    #[test]
    fn test_sso_routes_created() {
        let _routes = sso_routes();
    }

    #[test]
    fn test_state_from_config() {
        let store = MemoryStore::new();
        let config = SsoConfig {
            provider_store: Arc::new(store.clone()),
            account_store: Arc::new(store),
            allow_insecure_issuers: false,
            http_timeout: Duration::from_secs(10),
            login_session_ttl: Duration::from_secs(600),
        };
        let state = SsoState::new(&config).unwrap();
        assert_eq!(state.auth_flow.sessions().ttl(), Duration::from_secs(600));
        let _router = create_sso_router(state);
    }
}
