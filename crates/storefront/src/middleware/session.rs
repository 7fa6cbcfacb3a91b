//! Browser session middleware.
//!
//! Each browser gets a `tower-sessions` session held in process memory. The
//! session carries only the browser's shopper key; the cart itself lives in
//! the [`Shopper`](crate::state::Shopper) that key maps to, so two browsers
//! never share a cart.

use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};
use uuid::Uuid;

use crate::config::StorefrontConfig;
use crate::storage::{StorageError, keys};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "ep_session";

/// Session expiry time in seconds (7 days).
pub const SESSION_EXPIRY_SECONDS: i64 = 7 * 24 * 60 * 60;

/// Create the session layer with an in-memory store.
#[must_use]
pub fn create_session_layer(config: &StorefrontConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}

impl From<tower_sessions::session::Error> for StorageError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Backend(err.to_string())
    }
}

/// The browser's shopper key, assigned and stored on first use.
///
/// # Errors
///
/// Returns an error if the session record cannot be loaded or updated.
pub async fn shopper_key(session: &Session) -> Result<String, StorageError> {
    if let Some(key) = session.get::<String>(keys::SHOPPER).await? {
        return Ok(key);
    }

    let key = Uuid::new_v4().to_string();
    session.insert(keys::SHOPPER, &key).await?;
    tracing::debug!(shopper = %key, "Assigned shopper key");
    Ok(key)
}
