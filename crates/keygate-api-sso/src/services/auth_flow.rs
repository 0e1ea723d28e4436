//! Authorization-code flow against the active identity provider.
//!
//! Handles the OIDC authorization code flow with PKCE: the login redirect,
//! the code-for-token exchange and the userinfo lookup.

use keygate_core::LoginSessionId;
use keygate_db::models::{SsoProtocol, SsoProvider};
use openidconnect::{CsrfToken, PkceCodeChallenge};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::instrument;

use crate::error::{SsoError, SsoResult};
use crate::models::RemoteIdentity;
use crate::services::{DiscoveryService, LoginSessionStore, NewPendingLogin, ProviderConfigService};

/// Scopes requested from the identity provider.
pub const LOGIN_SCOPES: &str = "openid profile email";

/// Path the identity provider redirects back to.
pub const CALLBACK_PATH: &str = "/callback";

const MAX_LOGGED_BODY: usize = 500;

/// Authorization flow service.
#[derive(Clone)]
pub struct AuthFlowService {
    providers: ProviderConfigService,
    discovery: DiscoveryService,
    sessions: LoginSessionStore,
}

/// Where to send the browser, and the pending login it belongs to.
#[derive(Debug, Clone)]
pub struct AuthorizationRedirect {
    /// The URL to redirect the user to.
    pub url: String,
    /// The session ID for tracking.
    pub session_id: LoginSessionId,
    /// The state token for CSRF protection.
    pub state: String,
}

/// What the browser brings back to the callback.
#[derive(Debug, Clone)]
pub struct CallbackInput {
    pub session_id: LoginSessionId,
    pub state: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
}

impl AuthFlowService {
    pub fn new(
        providers: ProviderConfigService,
        discovery: DiscoveryService,
        sessions: LoginSessionStore,
    ) -> Self {
        Self {
            providers,
            discovery,
            sessions,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> &LoginSessionStore {
        &self.sessions
    }

    /// Start a login: record a pending session and build the provider's
    /// authorization URL.
    #[instrument(skip(self))]
    pub async fn begin_login(&self, scheme: &str, host: &str) -> SsoResult<AuthorizationRedirect> {
        let provider = self
            .providers
            .active_provider()
            .await?
            .ok_or(SsoError::NoProviderConfigured)?;

        let protocol = parse_protocol(&provider)?;

        if !provider.enabled {
            return Err(SsoError::ProviderDisabled(provider.id));
        }

        let redirect_uri = build_callback_url(scheme, host);

        let endpoints = match protocol {
            SsoProtocol::OpenId => self.discovery.discover(&provider.issuer_address).await?,
        };

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let state = CsrfToken::new_random();

        let mut auth_url = url::Url::parse(&endpoints.authorization_endpoint)
            .map_err(|e| SsoError::InvalidConfiguration(e.to_string()))?;

        {
            let mut query = auth_url.query_pairs_mut();
            query.append_pair("response_type", "code");
            query.append_pair("client_id", &provider.client_id);
            query.append_pair("redirect_uri", &redirect_uri);
            query.append_pair("scope", LOGIN_SCOPES);
            query.append_pair("state", state.secret());
            query.append_pair("code_challenge", pkce_challenge.as_str());
            query.append_pair("code_challenge_method", "S256");
        }

        let session_id = self
            .sessions
            .insert(NewPendingLogin {
                state: state.secret().clone(),
                pkce_verifier: pkce_verifier.secret().clone(),
                redirect_uri,
                provider_id: provider.provider_id(),
            })
            .await;

        tracing::info!(
            provider_id = %provider.id,
            session_id = %session_id,
            "Initiated SSO login"
        );

        Ok(AuthorizationRedirect {
            url: auth_url.to_string(),
            session_id,
            state: state.secret().clone(),
        })
    }

    /// Finish a login: validate the pending session, exchange the code and
    /// fetch the remote identity. Nothing is persisted here.
    #[instrument(skip(self, input), fields(session_id = %input.session_id))]
    pub async fn complete_login(&self, input: CallbackInput) -> SsoResult<RemoteIdentity> {
        let pending = self.sessions.consume(input.session_id).await?;

        if pending.state != input.state {
            tracing::warn!(
                session_id = %pending.id,
                "State mismatch on SSO callback"
            );
            return Err(SsoError::InvalidState);
        }

        let provider = self.providers.get(pending.provider_id).await?;
        let protocol = parse_protocol(&provider)?;

        let endpoints = match protocol {
            SsoProtocol::OpenId => self.discovery.discover(&provider.issuer_address).await?,
        };

        let token = self
            .exchange_code(
                &endpoints.token_endpoint,
                &input.code,
                &provider,
                &pending.redirect_uri,
                &pending.pkce_verifier,
            )
            .await?;

        tracing::info!(
            provider_id = %provider.id,
            token_type = token.token_type.as_deref().unwrap_or("unknown"),
            "Token exchange successful"
        );

        let userinfo_endpoint = endpoints.userinfo_endpoint.ok_or_else(|| {
            SsoError::UserInfoFailed("provider does not advertise a userinfo endpoint".to_string())
        })?;

        let claims = self
            .fetch_userinfo(&userinfo_endpoint, &token.access_token)
            .await?;

        RemoteIdentity::from_claims(claims)
    }

    /// Exchange authorization code for tokens.
    async fn exchange_code(
        &self,
        token_endpoint: &str,
        code: &str,
        provider: &SsoProvider,
        redirect_uri: &str,
        pkce_verifier: &str,
    ) -> SsoResult<TokenResponse> {
        self.discovery.check_outbound_url(token_endpoint)?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", provider.client_id.as_str()),
            ("client_secret", provider.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
            ("code_verifier", pkce_verifier),
        ];

        let response = self
            .discovery
            .http_client()
            .post(token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| SsoError::TokenExchangeFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                token_endpoint = %token_endpoint,
                status = %status,
                error = %truncate_for_log(&error_text),
                "Token exchange failed"
            );
            return Err(SsoError::TokenExchangeFailed(format!(
                "Token endpoint returned HTTP {status}"
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| SsoError::TokenExchangeFailed(e.to_string()))
    }

    async fn fetch_userinfo(
        &self,
        userinfo_endpoint: &str,
        access_token: &str,
    ) -> SsoResult<Map<String, Value>> {
        self.discovery
            .check_outbound_url(userinfo_endpoint)
            .map_err(|e| SsoError::UserInfoFailed(e.to_string()))?;

        let response = self
            .discovery
            .http_client()
            .get(userinfo_endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| SsoError::UserInfoFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!(
                userinfo_endpoint = %userinfo_endpoint,
                status = %status,
                error = %truncate_for_log(&error_text),
                "Userinfo request failed"
            );
            return Err(SsoError::UserInfoFailed(format!(
                "Userinfo endpoint returned HTTP {status}"
            )));
        }

        response
            .json::<Map<String, Value>>()
            .await
            .map_err(|e| SsoError::UserInfoFailed(e.to_string()))
    }
}

fn parse_protocol(provider: &SsoProvider) -> SsoResult<SsoProtocol> {
    provider
        .protocol()
        .map_err(|_| SsoError::UnsupportedProtocol(provider.protocol.clone()))
}

/// `{scheme}://{host}/callback`, where scheme is `https` when the request
/// declared it (case-insensitive) and `http` otherwise.
#[must_use]
pub fn build_callback_url(scheme: &str, host: &str) -> String {
    let scheme = if scheme.to_ascii_lowercase().starts_with("https") {
        "https"
    } else {
        "http"
    };
    format!("{scheme}://{host}{CALLBACK_PATH}")
}

/// Cut an upstream response body to a bounded, char-safe length.
fn truncate_for_log(text: &str) -> String {
    if text.len() <= MAX_LOGGED_BODY {
        return text.to_string();
    }
    let safe_end = text
        .char_indices()
        .take_while(|(i, _)| *i < MAX_LOGGED_BODY)
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    format!("{}... (truncated)", &text[..safe_end])
}
