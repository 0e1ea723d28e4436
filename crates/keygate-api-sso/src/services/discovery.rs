//! OIDC Discovery service for fetching provider metadata.

use crate::error::{SsoError, SsoResult};
use openidconnect::{core::CoreProviderMetadata, IssuerUrl};
use std::net::IpAddr;
use std::time::Duration;
use tracing::instrument;

const WELL_KNOWN_SUFFIXES: [&str; 2] = ["/.well-known/openid-configuration", "/.well-known"];

/// Discovered OIDC endpoints from provider metadata.
#[derive(Debug, Clone)]
pub struct DiscoveredEndpoints {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub userinfo_endpoint: Option<String>,
}

/// OIDC Discovery service.
///
/// Owns the outbound HTTP client shared by every call to the identity
/// provider: redirects disabled, request timeout applied.
#[derive(Debug, Clone)]
pub struct DiscoveryService {
    http_client: reqwest::Client,
    allow_insecure: bool,
}

impl DiscoveryService {
    /// Create a discovery service.
    ///
    /// With `allow_insecure` set, plain-http and private-network issuers are
    /// accepted. Meant for development and tests only.
    pub fn new(allow_insecure: bool, timeout: Duration) -> SsoResult<Self> {
        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|e| SsoError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            allow_insecure,
        })
    }

    /// HTTP client for token and userinfo requests.
    #[must_use]
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http_client
    }

    /// Reject URLs pointing at internal services, unless insecure issuers are allowed.
    pub fn check_outbound_url(&self, url: &str) -> SsoResult<()> {
        if self.allow_insecure {
            return Ok(());
        }
        validate_url_not_internal(url)
            .map_err(|e| SsoError::InvalidConfiguration(format!("SSRF protection: {e}")))
    }

    /// Discover OIDC provider metadata from issuer URL.
    #[instrument(skip(self), fields(issuer = %issuer_url))]
    pub async fn discover(&self, issuer_url: &str) -> SsoResult<DiscoveredEndpoints> {
        let issuer_url = normalize_issuer(issuer_url);

        self.check_outbound_url(&issuer_url)?;

        let issuer = IssuerUrl::new(issuer_url.clone())
            .map_err(|e| SsoError::InvalidConfiguration(format!("Invalid issuer URL: {e}")))?;

        let metadata = CoreProviderMetadata::discover_async(issuer, &self.http_client)
            .await
            .map_err(|e| SsoError::DiscoveryFailed {
                issuer: issuer_url.clone(),
                message: e.to_string(),
            })?;

        let endpoints = DiscoveredEndpoints {
            authorization_endpoint: metadata.authorization_endpoint().url().to_string(),
            token_endpoint: metadata
                .token_endpoint()
                .ok_or_else(|| SsoError::DiscoveryFailed {
                    issuer: issuer_url.clone(),
                    message: "Token endpoint not found".to_string(),
                })?
                .url()
                .to_string(),
            userinfo_endpoint: metadata.userinfo_endpoint().map(|e| e.url().to_string()),
        };

        tracing::info!(
            authorization_endpoint = %endpoints.authorization_endpoint,
            token_endpoint = %endpoints.token_endpoint,
            "Successfully discovered OIDC endpoints"
        );

        Ok(endpoints)
    }
}

/// Strip trailing slashes and any well-known suffix so both the issuer and
/// its discovery document address are accepted.
#[must_use]
pub fn normalize_issuer(issuer_url: &str) -> String {
    let mut issuer = issuer_url.trim().trim_end_matches('/');
    for suffix in WELL_KNOWN_SUFFIXES {
        if let Some(stripped) = issuer.strip_suffix(suffix) {
            issuer = stripped.trim_end_matches('/');
            break;
        }
    }
    issuer.to_string()
}

/// SSRF protection: validate that a URL does not target internal/private services.
pub(crate) fn validate_url_not_internal(url_str: &str) -> Result<(), String> {
    let url = url::Url::parse(url_str).map_err(|e| format!("Invalid URL: {e}"))?;

    let scheme = url.scheme();
    if scheme != "https" {
        return Err(format!("Only HTTPS is allowed for IdP URLs, got: {scheme}"));
    }

    let host = url
        .host_str()
        .ok_or_else(|| "URL has no host".to_string())?;

    if let Ok(ip) = host.trim_matches(['[', ']']).parse::<IpAddr>() {
        match ip {
            IpAddr::V4(v4) => {
                if v4.is_loopback()
                    || v4.is_private()
                    || v4.is_link_local()
                    || v4.is_broadcast()
                    || v4.is_unspecified()
                    || v4.is_documentation()
                {
                    return Err(format!("Internal/private IP not allowed: {host}"));
                }
            }
            IpAddr::V6(v6) => {
                if v6.is_loopback() || v6.is_unspecified() {
                    return Err(format!("Internal/private IP not allowed: {host}"));
                }
                let segs = v6.segments();
                if (segs[0] & 0xfe00) == 0xfc00 || (segs[0] & 0xffc0) == 0xfe80 {
                    return Err(format!("Internal/private IP not allowed: {host}"));
                }
            }
        }
    } else {
        let lower = host.to_lowercase();
        let blocked = ["localhost", "metadata.google.internal", "metadata.goog"];
        for b in blocked {
            if lower == b || lower.ends_with(&format!(".{b}")) {
                return Err(format!("Blocked hostname: {host}"));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_issuer_strips_well_known() {
        assert_eq!(
            normalize_issuer("https://idp.example/.well-known/openid-configuration"),
            "https://idp.example"
        );
        assert_eq!(
            normalize_issuer("https://idp.example/.well-known"),
            "https://idp.example"
        );
        assert_eq!(
            normalize_issuer("https://idp.example/realms/main/"),
            "https://idp.example/realms/main"
        );
    }

    #[test]
    fn test_ssrf_guard() {
        assert!(validate_url_not_internal("https://idp.example").is_ok());
        assert!(validate_url_not_internal("http://idp.example").is_err());
        assert!(validate_url_not_internal("https://127.0.0.1").is_err());
        assert!(validate_url_not_internal("https://10.1.2.3/realm").is_err());
        assert!(validate_url_not_internal("https://169.254.169.254").is_err());
        assert!(validate_url_not_internal("https://localhost:8443").is_err());
        assert!(validate_url_not_internal("https://[::1]").is_err());
    }

    #[test]
    fn test_insecure_mode_skips_guard() {
        let service = DiscoveryService::new(true, Duration::from_secs(1)).unwrap();
        assert!(service.check_outbound_url("http://127.0.0.1:9000").is_ok());

        let strict = DiscoveryService::new(false, Duration::from_secs(1)).unwrap();
        assert!(matches!(
            strict.check_outbound_url("http://127.0.0.1:9000"),
            Err(SsoError::InvalidConfiguration(_))
        ));
    }

    #[tokio::test]
    async fn test_discover_blocked_issuer_is_configuration_error() {
        let strict = DiscoveryService::new(false, Duration::from_secs(1)).unwrap();
        let err = strict.discover("http://localhost/").await.unwrap_err();
        assert!(matches!(err, SsoError::InvalidConfiguration(_)));
    }
}
