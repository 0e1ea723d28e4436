//! Application assembly: store selection and the HTTP router.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use keygate_api_sso::{create_sso_router, SsoConfig, SsoState};
use keygate_db::{run_migrations, AccountStore, DbError, MemoryStore, PgStore, ProviderStore};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::config::Config;

/// Storage backends handed to the SSO router.
pub struct Stores {
    pub providers: Arc<dyn ProviderStore>,
    pub accounts: Arc<dyn AccountStore>,
}

/// Connect to PostgreSQL and migrate, or fall back to the in-memory store.
pub async fn open_stores(config: &Config) -> Result<Stores, DbError> {
    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.database_max_connections).await?;
            run_migrations(&store).await?;
            Ok(Stores {
                providers: Arc::new(store.clone()),
                accounts: Arc::new(store),
            })
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            let store = MemoryStore::new();
            Ok(Stores {
                providers: Arc::new(store.clone()),
                accounts: Arc::new(store),
            })
        }
    }
}

pub fn sso_config(config: &Config, stores: Stores) -> SsoConfig {
    if config.allow_insecure_issuers {
        tracing::warn!("Insecure identity provider issuers are allowed");
    }

    SsoConfig {
        provider_store: stores.providers,
        account_store: stores.accounts,
        allow_insecure_issuers: config.allow_insecure_issuers,
        http_timeout: config.http_timeout,
        login_session_ttl: config.login_session_ttl,
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Full router: health check plus the SSO API, with request tracing.
pub fn build_router(state: SsoState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(create_sso_router(state))
        .layer(TraceLayer::new_for_http())
}
