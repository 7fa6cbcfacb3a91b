//! Catalog listing shared by every shopper.

use std::borrow::Cow;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::instrument;

use epcc_storefront_core::ProductId;

use super::{InFlight, SessionError};
use crate::epcc::{self, EpccClient, Product, ProductImage};

#[derive(Debug, Default)]
struct ProductState {
    products: Vec<Product>,
    images: Vec<ProductImage>,
    loaded: bool,
    error: Option<String>,
}

/// A product flattened for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductView {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub sku: Option<String>,
    pub price: Option<String>,
    pub image_url: Option<String>,
}

/// Point-in-time view of a [`ProductListing`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductSnapshot {
    pub products: Vec<ProductView>,
    pub loading: bool,
    pub error: Option<String>,
}

/// The storefront catalog listing.
///
/// Fetched on first [`load`](Self::load) and again on every
/// [`refetch`](Self::refetch). No pagination or caching beyond that.
#[derive(Debug)]
pub struct ProductListing {
    client: EpccClient,
    state: RwLock<ProductState>,
    loading: InFlight,
}

impl ProductListing {
    #[must_use]
    pub fn new(client: EpccClient) -> Self {
        Self {
            client,
            state: RwLock::new(ProductState::default()),
            loading: InFlight::default(),
        }
    }

    /// Fetch the catalog unless it has already been fetched successfully.
    ///
    /// # Errors
    ///
    /// Returns the EPCC error if the fetch fails.
    pub async fn load(&self) -> Result<(), SessionError> {
        if self.state.read().await.loaded {
            return Ok(());
        }
        self.refetch().await
    }

    /// Fetch the catalog, replacing what was loaded before.
    ///
    /// # Errors
    ///
    /// Returns the EPCC error if the fetch fails; previously loaded products
    /// are kept.
    #[instrument(skip(self))]
    pub async fn refetch(&self) -> Result<(), SessionError> {
        self.state.write().await.error = None;

        let result = {
            let _loading = self.loading.enter();
            self.client.list_products().await
        };

        let mut state = self.state.write().await;
        match result {
            Ok(list) => {
                let (products, images) = list.into_parts();
                state.products = products;
                state.images = images;
                state.loaded = true;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load products");
                state.error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Loaded catalog products.
    pub async fn products(&self) -> Vec<Product> {
        self.state.read().await.products.clone()
    }

    /// Main images included with the last fetch.
    pub async fn images(&self) -> Vec<ProductImage> {
        self.state.read().await.images.clone()
    }

    /// Link to a product's main image, if it was included in the last fetch.
    pub async fn main_image_url(&self, product: &Product) -> Option<String> {
        let state = self.state.read().await;
        epcc::main_image_url(product, &state.images).map(str::to_string)
    }

    pub async fn snapshot(&self) -> ProductSnapshot {
        let state = self.state.read().await;
        let products = state
            .products
            .iter()
            .map(|product| ProductView {
                id: product.id.clone(),
                name: product.attributes.name.clone(),
                description: product.attributes.description.clone(),
                sku: product.attributes.sku.clone(),
                price: product.display_price().map(Cow::into_owned),
                image_url: epcc::main_image_url(product, &state.images).map(str::to_string),
            })
            .collect();

        ProductSnapshot {
            products,
            loading: self.loading.is_active(),
            error: state.error.clone(),
        }
    }
}
