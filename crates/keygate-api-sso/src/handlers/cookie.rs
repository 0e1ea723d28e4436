//! Login-session cookie.
//!
//! Carries the pending login id from `/sso/login` to the callback.
//! `SameSite=Lax` so the cookie survives the top-level redirect back from
//! the identity provider.

use std::time::Duration;

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use keygate_core::LoginSessionId;

/// Cookie name for pending SSO logins.
pub const LOGIN_SESSION_COOKIE: &str = "keygate_sso_session";

#[must_use]
pub fn create_login_cookie(session_id: LoginSessionId, secure: bool, max_age: Duration) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!(
        "{LOGIN_SESSION_COOKIE}={session_id}; HttpOnly{secure_flag}; SameSite=Lax; Path=/; Max-Age={}",
        max_age.as_secs()
    )
}

#[must_use]
pub fn clear_login_cookie(secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!("{LOGIN_SESSION_COOKIE}=; HttpOnly{secure_flag}; SameSite=Lax; Path=/; Max-Age=0")
}

/// Append a `Set-Cookie` header. Values that are not valid header text are dropped.
pub fn append_cookie(headers: &mut HeaderMap, cookie: &str) {
    if let Ok(value) = HeaderValue::from_str(cookie) {
        headers.append(SET_COOKIE, value);
    }
}

/// Extract the login session id from request cookies.
pub fn extract_login_cookie(headers: &HeaderMap) -> Option<LoginSessionId> {
    let prefix = format!("{LOGIN_SESSION_COOKIE}=");
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|part| part.trim().strip_prefix(prefix.as_str()).map(str::to_string))
        .and_then(|value| value.trim().parse().ok())
}
