//! Admin handlers for SSO provider management.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use keygate_core::ProviderId;
use keygate_db::models::SsoProvider;
use tracing::instrument;

use crate::error::{SsoError, SsoResult};
use crate::models::{ProviderRequest, StatusResponse, TestConnectResponse};
use crate::router::SsoState;

/// List provider configurations.
///
/// GET /sso/
#[instrument(skip(state))]
pub async fn list_providers(State(state): State<SsoState>) -> SsoResult<Json<Vec<SsoProvider>>> {
    Ok(Json(state.provider_config.list().await?))
}

/// Create a provider configuration.
///
/// POST /sso/
#[instrument(skip(state, req))]
pub async fn create_provider(
    State(state): State<SsoState>,
    Json(req): Json<ProviderRequest>,
) -> SsoResult<impl IntoResponse> {
    tracing::info!(
        protocol = %req.protocol,
        issuer = %req.issuer_address,
        "Admin creating SSO provider"
    );

    let provider = state.provider_config.create(req.into_settings()?).await?;

    Ok((StatusCode::CREATED, Json(provider)))
}

/// Update a provider configuration; the body carries the existing id.
///
/// PUT /sso/
#[instrument(skip(state, req))]
pub async fn update_provider(
    State(state): State<SsoState>,
    Json(req): Json<ProviderRequest>,
) -> SsoResult<Json<SsoProvider>> {
    let id = req
        .id
        .map(ProviderId::from_uuid)
        .ok_or_else(|| SsoError::InvalidRequest("id is required".to_string()))?;

    tracing::info!(provider_id = %id, "Admin updating SSO provider");

    let provider = state
        .provider_config
        .update(id, req.into_settings()?)
        .await?;

    Ok(Json(provider))
}

/// Check provider connectivity without persisting anything.
///
/// POST /sso/test/connect
#[instrument(skip(state, req))]
pub async fn test_connect(
    State(state): State<SsoState>,
    Json(req): Json<ProviderRequest>,
) -> SsoResult<Json<TestConnectResponse>> {
    let settings = req.into_settings()?;
    state.provider_config.test_connect(&settings).await?;
    Ok(Json(TestConnectResponse { success: true }))
}

/// Whether SSO login is offered.
///
/// GET /sso/status
#[instrument(skip(state))]
pub async fn status(State(state): State<SsoState>) -> SsoResult<Json<StatusResponse>> {
    Ok(Json(state.provider_config.status().await?))
}
