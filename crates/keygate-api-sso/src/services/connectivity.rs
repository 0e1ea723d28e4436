//! Connectivity verification against an identity provider.

use async_trait::async_trait;
use keygate_db::models::{ProviderSettings, SsoProtocol};
use tracing::instrument;

use crate::error::{SsoError, SsoResult};
use crate::services::DiscoveryService;

/// Checks that provider settings describe a reachable identity provider.
///
/// Implementations must not mutate any state. Every failure is returned.
#[async_trait]
pub trait ConnectivityVerifier: Send + Sync {
    async fn test_connect(&self, settings: &ProviderSettings) -> SsoResult<()>;
}

/// Verifier that runs OIDC discovery for `openid` providers.
#[derive(Debug, Clone)]
pub struct OidcConnectivityVerifier {
    discovery: DiscoveryService,
}

impl OidcConnectivityVerifier {
    #[must_use]
    pub fn new(discovery: DiscoveryService) -> Self {
        Self { discovery }
    }
}

#[async_trait]
impl ConnectivityVerifier for OidcConnectivityVerifier {
    #[instrument(skip(self, settings), fields(protocol = %settings.protocol, issuer = %settings.issuer_address))]
    async fn test_connect(&self, settings: &ProviderSettings) -> SsoResult<()> {
        let protocol = settings
            .protocol
            .parse::<SsoProtocol>()
            .map_err(|_| SsoError::UnsupportedProtocol(settings.protocol.clone()))?;

        match protocol {
            SsoProtocol::OpenId => {
                self.discovery.discover(&settings.issuer_address).await?;
            }
        }

        tracing::debug!("Identity provider is reachable");
        Ok(())
    }
}
