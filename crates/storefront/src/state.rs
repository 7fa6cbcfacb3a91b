//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tower_sessions::Session;

use crate::config::StorefrontConfig;
use crate::epcc::EpccClient;
use crate::middleware::session::{SESSION_EXPIRY_SECONDS, shopper_key};
use crate::session::{CartSession, CheckoutSession, ProductListing};
use crate::storage::{MemoryStore, SessionStore, StorageError};

/// Upper bound on shoppers held in memory at once.
const MAX_SHOPPERS: u64 = 10_000;

/// One browser's cart and checkout.
///
/// Both sessions share a store holding the cart ID, so every request from the
/// browser sees the same cart and checkout phase.
#[derive(Debug)]
pub struct Shopper {
    pub cart: CartSession,
    pub checkout: CheckoutSession,
}

impl Shopper {
    #[must_use]
    pub fn new(client: &EpccClient) -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        Self {
            cart: CartSession::new(client.clone(), store.clone()),
            checkout: CheckoutSession::new(client.clone(), store),
        }
    }
}

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. The access token is shared by every
/// browser; each browser session maps to its own [`Shopper`].
#[derive(Clone, Debug)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    client: EpccClient,
    products: ProductListing,
    shoppers: Cache<String, Arc<Shopper>>,
}

impl std::fmt::Debug for AppStateInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppStateInner")
            .field("config", &self.config)
            .field("shoppers", &self.shoppers.entry_count())
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Create state whose access token is held in process memory.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        Self::with_token_store(config, Arc::new(MemoryStore::new()))
    }

    /// Create state with an explicit token store.
    #[must_use]
    pub fn with_token_store(config: StorefrontConfig, token_store: Arc<dyn SessionStore>) -> Self {
        let client = EpccClient::new(config.epcc.clone(), token_store);
        let products = ProductListing::new(client.clone());

        // Shoppers idle out with their browser session
        let shoppers = Cache::builder()
            .max_capacity(MAX_SHOPPERS)
            .time_to_idle(Duration::from_secs(SESSION_EXPIRY_SECONDS.unsigned_abs()))
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                client,
                products,
                shoppers,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the EPCC client.
    #[must_use]
    pub fn client(&self) -> &EpccClient {
        &self.inner.client
    }

    /// The catalog listing shared by all shoppers.
    #[must_use]
    pub fn products(&self) -> &ProductListing {
        &self.inner.products
    }

    /// The shopper behind a browser session, created on first use.
    ///
    /// Concurrent first requests for one key share a single [`Shopper`].
    ///
    /// # Errors
    ///
    /// Returns an error if the browser session cannot be read or written.
    pub async fn shopper(&self, session: &Session) -> Result<Arc<Shopper>, StorageError> {
        let key = shopper_key(session).await?;
        let client = &self.inner.client;
        Ok(self
            .inner
            .shoppers
            .get_with(key, async { Arc::new(Shopper::new(client)) })
            .await)
    }
}
