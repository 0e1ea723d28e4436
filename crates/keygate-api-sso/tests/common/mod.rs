//! Shared helpers for SSO integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use keygate_api_sso::{SsoConfig, SsoState};
use keygate_db::models::{LocalAccount, NewLocalAccount, NewRoleBinding, ProviderSettings, RoleBinding};
use keygate_db::{AccountStore, AccountTransaction, DbError, DbResult, MemoryStore};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ACCESS_TOKEN: &str = "mock-access-token";
pub const CLIENT_ID: &str = "abc";
pub const CLIENT_SECRET: &str = "xyz";

/// Mock OpenID Connect identity provider.
pub struct IdpMockServer {
    pub server: MockServer,
    pub issuer: String,
}

impl IdpMockServer {
    /// Start a provider serving discovery and an empty key set.
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let idp = Self {
            issuer: server.uri(),
            server,
        };
        idp.mount_discovery().await;
        idp
    }

    /// Start a server that answers nothing: discovery fails with 404.
    pub async fn unreachable() -> Self {
        let server = MockServer::start().await;
        Self {
            issuer: server.uri(),
            server,
        }
    }

    pub fn discovery_document(&self) -> Value {
        let base = &self.issuer;
        json!({
            "issuer": base,
            "authorization_endpoint": format!("{base}/authorize"),
            "token_endpoint": format!("{base}/token"),
            "userinfo_endpoint": format!("{base}/userinfo"),
            "jwks_uri": format!("{base}/jwks"),
            "response_types_supported": ["code"],
            "subject_types_supported": ["public"],
            "id_token_signing_alg_values_supported": ["RS256"]
        })
    }

    async fn mount_discovery(&self) {
        Mock::given(method("GET"))
            .and(path("/.well-known/openid-configuration"))
            .respond_with(ResponseTemplate::new(200).set_body_json(self.discovery_document()))
            .mount(&self.server)
            .await;

        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"keys": []})))
            .mount(&self.server)
            .await;
    }

    /// Token endpoint accepting any PKCE-bound authorization code.
    pub async fn mount_token(&self) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code_verifier="))
            .and(body_string_contains(format!("client_id={CLIENT_ID}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": ACCESS_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_token_failure(&self) {
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant"
            })))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_userinfo(&self, claims: Value) {
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("authorization", format!("Bearer {ACCESS_TOKEN}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(claims))
            .mount(&self.server)
            .await;
    }

    pub async fn mount_userinfo_failure(&self) {
        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&self.server)
            .await;
    }

    /// Settings pointing at this provider.
    pub fn settings(&self, enabled: bool) -> ProviderSettings {
        ProviderSettings {
            protocol: "openid".to_string(),
            issuer_address: format!("{}/.well-known", self.issuer),
            client_id: CLIENT_ID.to_string(),
            client_secret: CLIENT_SECRET.to_string(),
            enabled,
        }
    }
}

pub fn alice_claims() -> Value {
    json!({
        "sub": "alice-sub",
        "email": "alice@example.com",
        "preferred_username": "alice",
        "name": "Alice"
    })
}

/// SSO state over one shared in-memory store.
pub fn sso_state(store: &MemoryStore) -> SsoState {
    sso_state_with_accounts(store, Arc::new(store.clone()))
}

pub fn sso_state_with_accounts(store: &MemoryStore, accounts: Arc<dyn AccountStore>) -> SsoState {
    let config = SsoConfig {
        provider_store: Arc::new(store.clone()),
        account_store: accounts,
        allow_insecure_issuers: true,
        http_timeout: Duration::from_secs(5),
        login_session_ttl: Duration::from_secs(600),
    };
    SsoState::new(&config).expect("state")
}

/// Account store whose role-binding creation always fails.
pub struct FailingBindingStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl AccountStore for FailingBindingStore {
    async fn find_account_by_name_or_email(&self, key: &str) -> DbResult<Option<LocalAccount>> {
        self.inner.find_account_by_name_or_email(key).await
    }

    async fn begin(&self) -> DbResult<Box<dyn AccountTransaction>> {
        Ok(Box::new(FailingBindingTransaction {
            inner: self.inner.begin().await?,
        }))
    }
}

struct FailingBindingTransaction {
    inner: Box<dyn AccountTransaction>,
}

#[async_trait]
impl AccountTransaction for FailingBindingTransaction {
    async fn create_account(&mut self, input: NewLocalAccount) -> DbResult<LocalAccount> {
        self.inner.create_account(input).await
    }

    async fn create_role_binding(&mut self, input: NewRoleBinding) -> DbResult<RoleBinding> {
        Err(DbError::NotFound(format!("role {}", input.role_ref)))
    }

    async fn commit(self: Box<Self>) -> DbResult<()> {
        self.inner.commit().await
    }

    async fn rollback(self: Box<Self>) -> DbResult<()> {
        self.inner.rollback().await
    }
}

/// Read a query parameter from an absolute URL.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()?
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}
