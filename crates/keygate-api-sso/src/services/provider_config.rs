//! SSO provider configuration management.

use std::sync::Arc;

use chrono::Utc;
use keygate_core::ProviderId;
use keygate_db::models::{ProviderSettings, SsoProvider};
use keygate_db::ProviderStore;
use tracing::instrument;

use crate::error::{SsoError, SsoResult};
use crate::services::ConnectivityVerifier;

/// CRUD over provider records.
///
/// Every create and update re-verifies connectivity first; nothing is
/// persisted when the check fails. The first record in the store's default
/// order is the active provider and its `enabled` flag is the global SSO
/// switch.
#[derive(Clone)]
pub struct ProviderConfigService {
    store: Arc<dyn ProviderStore>,
    verifier: Arc<dyn ConnectivityVerifier>,
}

impl ProviderConfigService {
    pub fn new(store: Arc<dyn ProviderStore>, verifier: Arc<dyn ConnectivityVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Run the connectivity check only.
    #[instrument(skip(self, settings), fields(issuer = %settings.issuer_address))]
    pub async fn test_connect(&self, settings: &ProviderSettings) -> SsoResult<()> {
        self.verifier.test_connect(settings).await
    }

    /// Create a provider record.
    #[instrument(skip(self, settings), fields(issuer = %settings.issuer_address))]
    pub async fn create(&self, settings: ProviderSettings) -> SsoResult<SsoProvider> {
        self.verifier.test_connect(&settings).await?;

        let provider = SsoProvider::new(settings, Utc::now());
        let stored = self.store.insert_provider(&provider).await?;

        tracing::info!(
            provider_id = %stored.id,
            enabled = stored.enabled,
            "Created SSO provider"
        );

        Ok(stored)
    }

    /// Replace the settings of an existing provider, keeping its id and
    /// creation time.
    #[instrument(skip(self, settings), fields(issuer = %settings.issuer_address))]
    pub async fn update(&self, id: ProviderId, settings: ProviderSettings) -> SsoResult<SsoProvider> {
        self.verifier.test_connect(&settings).await?;

        let existing = self
            .store
            .find_provider(*id.as_uuid())
            .await?
            .ok_or(SsoError::ProviderNotFound(*id.as_uuid()))?;

        let updated = existing.with_settings(settings, Utc::now());

        if existing.enabled != updated.enabled {
            tracing::info!(
                provider_id = %id,
                from = existing.enabled,
                to = updated.enabled,
                "SSO provider enabled flag changed"
            );
        }

        let stored = self.store.update_provider(&updated).await.map_err(|e| {
            if e.is_not_found() {
                SsoError::ProviderNotFound(*id.as_uuid())
            } else {
                SsoError::Database(e)
            }
        })?;

        tracing::info!(provider_id = %id, "Updated SSO provider");

        Ok(stored)
    }

    /// All provider records, unfiltered.
    pub async fn list(&self) -> SsoResult<Vec<SsoProvider>> {
        Ok(self.store.list_providers().await?)
    }

    pub async fn get(&self, id: ProviderId) -> SsoResult<SsoProvider> {
        self.store
            .find_provider(*id.as_uuid())
            .await?
            .ok_or(SsoError::ProviderNotFound(*id.as_uuid()))
    }

    /// The active provider: first record in default order.
    pub async fn active_provider(&self) -> SsoResult<Option<SsoProvider>> {
        Ok(self.store.list_providers().await?.into_iter().next())
    }

    /// Whether SSO login is currently offered.
    pub async fn status(&self) -> SsoResult<bool> {
        Ok(self
            .active_provider()
            .await?
            .is_some_and(|provider| provider.enabled))
    }
}
