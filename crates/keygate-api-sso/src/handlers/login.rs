//! Browser login handlers.

use axum::{
    extract::{Query, State},
    http::{
        header::{ACCEPT_LANGUAGE, HOST, LOCATION},
        HeaderMap, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Json,
};
use keygate_core::Language;
use tracing::instrument;

use crate::error::{SsoError, SsoResult};
use crate::handlers::cookie::{
    append_cookie, clear_login_cookie, create_login_cookie, extract_login_cookie,
};
use crate::models::{CallbackParams, CallbackResponse};
use crate::router::SsoState;
use crate::services::CallbackInput;

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Start the authorization-code flow.
///
/// GET /sso/login
#[instrument(skip(state, headers))]
pub async fn login(
    State(state): State<SsoState>,
    headers: HeaderMap,
    uri: Uri,
) -> SsoResult<Response> {
    let scheme = request_scheme(&headers, &uri);
    let host = request_host(&headers, &uri)
        .ok_or_else(|| SsoError::InvalidRequest("Missing Host header".to_string()))?;

    let redirect = state.auth_flow.begin_login(&scheme, &host).await?;

    let secure = is_https(&scheme);
    let mut response = (StatusCode::FOUND, [(LOCATION, redirect.url)]).into_response();
    append_cookie(
        response.headers_mut(),
        &create_login_cookie(redirect.session_id, secure, state.login_session_ttl),
    );

    Ok(response)
}

/// Complete the flow and resolve the local account.
///
/// GET /sso/callback
#[instrument(skip(state, headers, params))]
pub async fn callback(
    State(state): State<SsoState>,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<CallbackParams>,
) -> SsoResult<Response> {
    if let Some(error) = params.error {
        return Err(SsoError::IdpError {
            error,
            description: params.error_description,
        });
    }

    let session_id = extract_login_cookie(&headers).ok_or(SsoError::LoginSessionNotFound)?;
    let code = params
        .code
        .ok_or_else(|| SsoError::InvalidCallback("Missing authorization code".to_string()))?;
    let state_param = params
        .state
        .ok_or_else(|| SsoError::InvalidCallback("Missing state parameter".to_string()))?;

    let identity = state
        .auth_flow
        .complete_login(CallbackInput {
            session_id,
            state: state_param,
            code,
        })
        .await?;

    let language = Language::from_accept_language(
        headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok()),
    );

    let resolved = state.provisioning.resolve(&identity, language).await?;

    tracing::info!(
        account_id = %resolved.account.id,
        created = resolved.created,
        "SSO login successful"
    );

    let secure = is_https(&request_scheme(&headers, &uri));
    let mut response = Json(CallbackResponse {
        account: resolved.account,
        created: resolved.created,
    })
    .into_response();
    append_cookie(response.headers_mut(), &clear_login_cookie(secure));

    Ok(response)
}

/// Declared request scheme: `X-Forwarded-Proto`, then the URI, else `http`.
fn request_scheme(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(X_FORWARDED_PROTO)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| uri.scheme_str().map(str::to_string))
        .unwrap_or_else(|| "http".to_string())
}

/// Request host: `X-Forwarded-Host`, then `Host`, then the URI authority.
fn request_host(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    [X_FORWARDED_HOST, HOST.as_str()]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(',').next())
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|authority| authority.to_string()))
}

fn is_https(scheme: &str) -> bool {
    scheme.to_ascii_lowercase().starts_with("https")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_scheme_prefers_forwarded_proto() {
        let mut headers = HeaderMap::new();
        let uri: Uri = "/sso/login".parse().unwrap();
        assert_eq!(request_scheme(&headers, &uri), "http");

        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("https"));
        assert_eq!(request_scheme(&headers, &uri), "https");

        let absolute: Uri = "https://example.com/sso/login".parse().unwrap();
        assert_eq!(request_scheme(&HeaderMap::new(), &absolute), "https");
    }

    #[test]
    fn test_host_prefers_forwarded_host() {
        let uri: Uri = "/sso/login".parse().unwrap();
        let mut headers = HeaderMap::new();
        assert_eq!(request_host(&headers, &uri), None);

        headers.insert(HOST, HeaderValue::from_static("internal:8080"));
        assert_eq!(request_host(&headers, &uri).as_deref(), Some("internal:8080"));

        headers.insert(X_FORWARDED_HOST, HeaderValue::from_static("example.com"));
        assert_eq!(request_host(&headers, &uri).as_deref(), Some("example.com"));
    }
}
