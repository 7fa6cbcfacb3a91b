//! CLI command implementations.

pub mod cart;
pub mod checkout;
pub mod products;

use std::path::Path;
use std::sync::Arc;

use epcc_storefront::config::{ConfigError, EpccConfig};
use epcc_storefront::epcc::EpccClient;
use epcc_storefront::session::{CartSession, CheckoutSession, ProductListing};
use epcc_storefront::storage::FileStore;

/// A shopper backed by a state file.
///
/// The file holds both the access token and the cart ID, so consecutive
/// invocations share one token and one cart.
pub struct Shop {
    config: EpccConfig,
    client: EpccClient,
    store: Arc<FileStore>,
}

impl Shop {
    /// Open the shopper state at `path` using EPCC settings from the environment.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = EpccConfig::from_env()?;
        let store = Arc::new(FileStore::new(path));
        tracing::debug!(state = %store.path().display(), "Using shopper state file");

        Ok(Self {
            client: EpccClient::new(config.clone(), store.clone()),
            config,
            store,
        })
    }

    pub fn cart(&self) -> CartSession {
        CartSession::new(self.client.clone(), self.store.clone())
    }

    pub fn checkout(&self) -> CheckoutSession {
        CheckoutSession::new(self.client.clone(), self.store.clone())
    }

    /// A checkout that pays through the manual gateway regardless of
    /// `EPCC_MANUAL_PAYMENT`.
    pub fn checkout_with_payment(&self) -> CheckoutSession {
        let config = self.config.clone().with_manual_payment(true);
        let client = EpccClient::new(config, self.store.clone());
        CheckoutSession::new(client, self.store.clone())
    }

    pub fn products(&self) -> ProductListing {
        ProductListing::new(self.client.clone())
    }
}
