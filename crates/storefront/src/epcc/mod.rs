//! Elastic Path Commerce Cloud shopper API client.
//!
//! # Architecture
//!
//! - Plain REST over `reqwest`; bodies are typed records from [`types`]
//! - Every request carries `EP-Inventories-Multi-Location: true`
//! - Every request except token issuance is authorized by the
//!   [`Authenticator`], which keeps an implicit-grant token in the injected
//!   [`SessionStore`](crate::storage::SessionStore) under `ep_credentials`
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use epcc_storefront::epcc::EpccClient;
//! use epcc_storefront::storage::MemoryStore;
//!
//! let client = EpccClient::new(config.epcc.clone(), Arc::new(MemoryStore::new()));
//! let cart = client.create_cart().await?;
//! client.add_cart_item(&cart.id, &"prod-1".into(), 1).await?;
//! ```

mod auth;
mod client;
pub mod types;

pub use auth::{AuthStatus, Authenticator};
pub use client::EpccClient;
pub use types::*;

use serde::Deserialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StorageError;

/// Errors that can occur when talking to EPCC.
#[derive(Debug, Error)]
pub enum EpccError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// EPCC answered with a non-success status.
    #[error("EPCC returned {status}: {}", format_api_errors(.errors))]
    Api {
        status: u16,
        errors: Vec<ApiErrorDetail>,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by EPCC.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// No access token could be obtained.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Client configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The token store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EpccError {
    /// HTTP status returned by EPCC, if the request got that far.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }
}

/// One entry of an EPCC `{"errors": [...]}` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub status: Option<serde_json::Value>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

impl ApiErrorDetail {
    /// Pull error details out of a response body.
    ///
    /// Bodies that are not EPCC error documents become a single entry
    /// holding a truncated copy of the text.
    pub(crate) fn from_body(body: &str) -> Vec<Self> {
        match serde_json::from_str::<ApiErrorBody>(body) {
            Ok(parsed) if !parsed.errors.is_empty() => parsed.errors,
            _ if body.trim().is_empty() => Vec::new(),
            _ => vec![Self {
                title: body.chars().take(200).collect(),
                ..Self::default()
            }],
        }
    }
}

fn format_api_errors(errors: &[ApiErrorDetail]) -> String {
    if errors.is_empty() {
        return "(no error details provided)".to_string();
    }

    errors
        .iter()
        .map(|e| match e.detail.as_deref().filter(|d| !d.is_empty()) {
            Some(detail) if !e.title.is_empty() => format!("{}: {detail}", e.title),
            Some(detail) => detail.to_string(),
            None => e.title.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_uses_title_and_detail() {
        let errors = ApiErrorDetail::from_body(
            r#"{"errors":[{"status":404,"title":"Not Found","detail":"Cart not found"}]}"#,
        );
        let err = EpccError::Api {
            status: 404,
            errors,
        };
        assert_eq!(err.to_string(), "EPCC returned 404: Not Found: Cart not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_api_error_joins_multiple() {
        let errors = ApiErrorDetail::from_body(
            r#"{"errors":[{"title":"Bad Request","detail":"quantity must be positive"},{"title":"Bad Request"}]}"#,
        );
        let err = EpccError::Api {
            status: 400,
            errors,
        };
        assert_eq!(
            err.to_string(),
            "EPCC returned 400: Bad Request: quantity must be positive; Bad Request"
        );
    }

    #[test]
    fn test_api_error_non_json_body() {
        let errors = ApiErrorDetail::from_body("<html>Bad Gateway</html>");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].title, "<html>Bad Gateway</html>");
    }

    #[test]
    fn test_api_error_empty_body() {
        let err = EpccError::Api {
            status: 500,
            errors: ApiErrorDetail::from_body(""),
        };
        assert_eq!(
            err.to_string(),
            "EPCC returned 500: (no error details provided)"
        );
    }

    #[test]
    fn test_rate_limited_display() {
        let err = EpccError::RateLimited(30);
        assert_eq!(err.to_string(), "Rate limited, retry after 30 seconds");
        assert_eq!(err.status(), Some(429));
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err = EpccError::from(ConfigError::MissingEnvVar("EPCC_CLIENT_ID".to_string()));
        assert_eq!(
            err.to_string(),
            "Missing environment variable: EPCC_CLIENT_ID"
        );
    }
}
