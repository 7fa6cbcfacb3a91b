//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required at first use
//! - `EPCC_ENDPOINT_URL` - EPCC API base URL (e.g., <https://useast.api.elasticpath.com>)
//! - `EPCC_CLIENT_ID` - Client ID used for implicit-grant tokens
//!
//! Their absence does not stop the server from starting; the first EPCC
//! request fails with a [`ConfigError`] instead.
//!
//! ## Optional
//! - `EPCC_MANUAL_PAYMENT` - Pay orders through the manual gateway after checkout (default: false)
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL; `https://` enables secure cookies (default: <http://localhost:3000>)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading or first use.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront server configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// EPCC API configuration
    pub epcc: EpccConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Elastic Path Commerce Cloud API configuration.
///
/// Both values are optional here and validated lazily by [`EpccConfig::endpoint`]
/// and [`EpccConfig::client_id`].
#[derive(Debug, Clone, Default)]
pub struct EpccConfig {
    /// API base URL as configured.
    pub endpoint_url: Option<String>,
    /// Implicit-grant client ID.
    pub client_id: Option<String>,
    /// Follow checkout with a manual-gateway payment.
    pub manual_payment: bool,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a server setting is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default("STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;

        Ok(Self {
            host,
            port,
            base_url: get_env_or_default("STOREFRONT_BASE_URL", "http://localhost:3000"),
            epcc: EpccConfig::from_env()?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl EpccConfig {
    /// Load EPCC settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `EPCC_MANUAL_PAYMENT` is not a boolean.
    pub fn from_env() -> Result<Self, ConfigError> {
        let manual_payment = match get_optional_env("EPCC_MANUAL_PAYMENT") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "EPCC_MANUAL_PAYMENT".to_string(),
                    format!("expected a boolean, got '{raw}'"),
                )
            })?,
            None => false,
        };

        Ok(Self {
            endpoint_url: get_optional_env("EPCC_ENDPOINT_URL"),
            client_id: get_optional_env("EPCC_CLIENT_ID"),
            manual_payment,
        })
    }

    /// Create a config pointing at `endpoint_url` with the given client ID.
    #[must_use]
    pub fn new(endpoint_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(endpoint_url.into()),
            client_id: Some(client_id.into()),
            manual_payment: false,
        }
    }

    /// Enable or disable the manual payment step.
    #[must_use]
    pub const fn with_manual_payment(mut self, enabled: bool) -> Self {
        self.manual_payment = enabled;
        self
    }

    /// The validated API base URL, without a trailing slash.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL is unset or not an absolute http(s) URL.
    pub fn endpoint(&self) -> Result<String, ConfigError> {
        let raw = self
            .endpoint_url
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("EPCC_ENDPOINT_URL".to_string()))?;

        let url = Url::parse(raw.trim()).map_err(|e| {
            ConfigError::InvalidEnvVar("EPCC_ENDPOINT_URL".to_string(), e.to_string())
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidEnvVar(
                "EPCC_ENDPOINT_URL".to_string(),
                format!("unsupported scheme '{}'", url.scheme()),
            ));
        }

        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    /// The configured client ID.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the client ID is unset or blank.
    pub fn client_id(&self) -> Result<&str, ConfigError> {
        self.client_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("EPCC_CLIENT_ID".to_string()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse common boolean spellings.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
