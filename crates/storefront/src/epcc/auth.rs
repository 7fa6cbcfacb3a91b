//! Implicit-grant token lifecycle.
//!
//! The token record lives in the injected store under
//! [`keys::CREDENTIALS`]. It is reused until `now > expires`, then replaced
//! by a fresh implicit-grant token. Refreshes are serialized so concurrent
//! requests on one authenticator issue a single token call.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

use super::types::AccessToken;
use super::{ApiErrorDetail, EpccError};
use crate::config::EpccConfig;
use crate::storage::{self, SessionStore, keys};

const TOKEN_PATH: &str = "/oauth/access_token";

/// Outcome of the most recent token attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum AuthStatus {
    /// No token has been requested yet.
    #[default]
    Unknown,
    /// A valid token is available.
    Authenticated,
    /// The last attempt failed with this message.
    Failed(String),
}

impl AuthStatus {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

/// Issues and caches shopper access tokens.
pub struct Authenticator {
    http: reqwest::Client,
    config: EpccConfig,
    store: Arc<dyn SessionStore>,
    refresh: Mutex<()>,
    status: RwLock<AuthStatus>,
    current: RwLock<Option<AccessToken>>,
}

impl Authenticator {
    pub(crate) fn new(
        http: reqwest::Client,
        config: EpccConfig,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            http,
            config,
            store,
            refresh: Mutex::new(()),
            status: RwLock::new(AuthStatus::Unknown),
            current: RwLock::new(None),
        }
    }

    /// Return a valid token, issuing a new one if the stored token is
    /// missing, unreadable or expired.
    ///
    /// # Errors
    ///
    /// Returns `EpccError::Config` if the endpoint or client ID is not
    /// configured, `EpccError::Auth` if the token request fails, or
    /// `EpccError::Storage` if the store cannot be read or written.
    pub async fn token(&self) -> Result<AccessToken, EpccError> {
        match self.get_or_issue().await {
            Ok(token) => {
                *self.status.write().await = AuthStatus::Authenticated;
                Ok(token)
            }
            Err(e) => {
                *self.status.write().await = AuthStatus::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Eagerly obtain a token and report the resulting status.
    ///
    /// Never fails; the error is recorded in the returned status.
    pub async fn initialize(&self) -> AuthStatus {
        if let Err(e) = self.token().await {
            tracing::warn!(error = %e, "Storefront authentication failed");
        }
        self.status().await
    }

    /// Outcome of the most recent token attempt.
    pub async fn status(&self) -> AuthStatus {
        self.status.read().await.clone()
    }

    /// The token most recently issued or loaded by this authenticator.
    pub async fn credentials(&self) -> Option<AccessToken> {
        self.current.read().await.clone()
    }

    async fn get_or_issue(&self) -> Result<AccessToken, EpccError> {
        if let Some(token) = self.stored_token().await? {
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;
        // Another task may have refreshed while we waited
        if let Some(token) = self.stored_token().await? {
            return Ok(token);
        }

        let token = self.issue().await?;
        storage::save(self.store.as_ref(), keys::CREDENTIALS, &token).await?;
        *self.current.write().await = Some(token.clone());
        Ok(token)
    }

    async fn stored_token(&self) -> Result<Option<AccessToken>, EpccError> {
        let token = storage::load::<AccessToken>(self.store.as_ref(), keys::CREDENTIALS)
            .await?
            .filter(|t| !t.is_blank() && !t.is_expired());

        if let Some(token) = &token {
            *self.current.write().await = Some(token.clone());
        }
        Ok(token)
    }

    /// Request a new implicit-grant token. Sent without the auth header.
    #[instrument(skip(self))]
    async fn issue(&self) -> Result<AccessToken, EpccError> {
        let url = format!("{}{TOKEN_PATH}", self.config.endpoint()?);
        let client_id = self.config.client_id()?;

        let response = self
            .http
            .post(&url)
            .header(super::client::MLI_HEADER, "true")
            .form(&[("grant_type", "implicit"), ("client_id", client_id)])
            .send()
            .await
            .map_err(|e| EpccError::Auth(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| EpccError::Auth(e.to_string()))?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "EPCC token request failed"
            );
            let api = EpccError::Api {
                status: status.as_u16(),
                errors: ApiErrorDetail::from_body(&body),
            };
            return Err(EpccError::Auth(api.to_string()));
        }

        let token: AccessToken = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse EPCC token response");
            EpccError::Auth(format!("invalid token response: {e}"))
        })?;

        tracing::info!(expires = token.expires, "Issued storefront access token");
        Ok(token)
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
