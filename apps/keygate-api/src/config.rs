//! Configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOGIN_SESSION_TTL_SECS: u64 = 600;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Configuration errors that can occur during environment loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Failed to parse port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

/// Server configuration.
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
    /// PostgreSQL connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub allow_insecure_issuers: bool,
    pub http_timeout: Duration,
    pub login_session_ttl: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("database_max_connections", &self.database_max_connections)
            .field("allow_insecure_issuers", &self.allow_insecure_issuers)
            .field("http_timeout", &self.http_timeout)
            .field("login_session_ttl", &self.login_session_ttl)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Optional Variables
    ///
    /// - `HOST` - Bind address (default: "0.0.0.0")
    /// - `PORT` - Listen port (default: 8080)
    /// - `RUST_LOG` - Log level filter (default: "info,keygate=debug")
    /// - `DATABASE_URL` - PostgreSQL connection string (default: in-memory store)
    /// - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
    /// - `SSO_ALLOW_INSECURE_ISSUERS` - Accept http and private issuers (default: false)
    /// - `SSO_HTTP_TIMEOUT_SECS` - Outbound IdP request timeout (default: 10)
    /// - `SSO_LOGIN_SESSION_TTL_SECS` - Pending login lifetime (default: 600)
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (development only)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port: u16 = lookup("PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse()?;

        let rust_log = lookup("RUST_LOG").unwrap_or_else(|| "info,keygate=debug".to_string());

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let database_max_connections = parse_number(
            &lookup,
            "DATABASE_MAX_CONNECTIONS",
            DEFAULT_MAX_CONNECTIONS,
        )?;

        let allow_insecure_issuers = match lookup("SSO_ALLOW_INSECURE_ISSUERS") {
            None => false,
            Some(value) => parse_bool("SSO_ALLOW_INSECURE_ISSUERS", &value)?,
        };

        let http_timeout = Duration::from_secs(parse_number(
            &lookup,
            "SSO_HTTP_TIMEOUT_SECS",
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);

        let login_session_ttl = Duration::from_secs(parse_number(
            &lookup,
            "SSO_LOGIN_SESSION_TTL_SECS",
            DEFAULT_LOGIN_SESSION_TTL_SECS,
        )?);

        if http_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                var: "SSO_HTTP_TIMEOUT_SECS".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            host,
            port,
            rust_log,
            database_url,
            database_max_connections,
            allow_insecure_issuers,
            http_timeout,
            login_session_ttl,
        })
    }

    /// Get the server bind address as a socket address string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_number<F, T>(lookup: &F, var: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                var: var.to_string(),
                message: e.to_string(),
            }),
    }
}

fn parse_bool(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            var: var.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}
