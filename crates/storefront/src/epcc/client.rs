use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use epcc_storefront_core::{CartId, CartItemId, CheckoutRequest, OrderId, ProductId};

use super::auth::Authenticator;
use super::types::{
    Cart, CartItemQuantity, CartWithItems, Data, ManualPayment, MaybeData, NewCart, NewCartItem,
    Order, PaymentTransaction, ProductList,
};
use super::{ApiErrorDetail, EpccError};
use crate::config::EpccConfig;
use crate::storage::SessionStore;

/// Multi-location inventory header sent on every request.
pub(crate) const MLI_HEADER: &str = "EP-Inventories-Multi-Location";

/// Name given to carts created by the storefront.
const CART_NAME: &str = "Cart";

// =============================================================================
// EpccClient
// =============================================================================

/// Client for the EPCC shopper API.
///
/// Cheap to clone; clones share the HTTP connection pool and the
/// [`Authenticator`].
#[derive(Clone, Debug)]
pub struct EpccClient {
    inner: Arc<EpccClientInner>,
}

#[derive(Debug)]
struct EpccClientInner {
    http: reqwest::Client,
    config: EpccConfig,
    auth: Authenticator,
}

impl EpccClient {
    /// Create a client whose access token is kept in `token_store`.
    #[must_use]
    pub fn new(config: EpccConfig, token_store: Arc<dyn SessionStore>) -> Self {
        let http = reqwest::Client::new();
        let auth = Authenticator::new(http.clone(), config.clone(), token_store);

        Self {
            inner: Arc::new(EpccClientInner { http, config, auth }),
        }
    }

    /// The token lifecycle behind this client.
    #[must_use]
    pub fn authenticator(&self) -> &Authenticator {
        &self.inner.auth
    }

    /// Whether checkout should be followed by a manual-gateway payment.
    #[must_use]
    pub fn manual_payment(&self) -> bool {
        self.inner.config.manual_payment
    }

    /// Build an authorized request for `path`.
    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, EpccError> {
        let url = format!("{}{path}", self.inner.config.endpoint()?);
        let token = self.inner.auth.token().await?;

        Ok(self
            .inner
            .http
            .request(method, url)
            .header(MLI_HEADER, "true")
            .bearer_auth(token.access_token.expose_secret()))
    }

    /// Send a request and return the raw body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String, EpccError> {
        let response = request.send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(EpccError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "EPCC API returned non-success status"
            );
            return Err(EpccError::Api {
                status: status.as_u16(),
                errors: ApiErrorDetail::from_body(&body),
            });
        }

        Ok(body)
    }

    /// Send a request and parse the JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, EpccError> {
        let body = self.send(request).await?;

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse EPCC response"
            );
            EpccError::Parse(e)
        })
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Create a new empty cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn create_cart(&self) -> Result<Cart, EpccError> {
        let body = Data::new(NewCart {
            name: CART_NAME.to_string(),
        });
        let request = self.request(Method::POST, "/v2/carts").await?.json(&body);
        let cart: Data<Cart> = self.execute(request).await?;

        debug!(cart_id = %cart.data.id, "Created cart");
        Ok(cart.data)
    }

    /// Fetch a cart together with its items.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the cart does not exist.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: &CartId) -> Result<CartWithItems, EpccError> {
        let path = format!("/v2/carts/{cart_id}?include=items");
        let request = self.request(Method::GET, &path).await?;
        self.execute(request).await
    }

    /// Add `quantity` of a product to a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, product_id = %product_id))]
    pub async fn add_cart_item(
        &self,
        cart_id: &CartId,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), EpccError> {
        let body = Data::new(NewCartItem::product(product_id.clone(), quantity));
        let path = format!("/v2/carts/{cart_id}/items");
        let request = self.request(Method::POST, &path).await?.json(&body);
        self.send(request).await?;
        Ok(())
    }

    /// Set the quantity of a cart item.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, item_id = %item_id))]
    pub async fn update_cart_item(
        &self,
        cart_id: &CartId,
        item_id: &CartItemId,
        quantity: u32,
    ) -> Result<(), EpccError> {
        let body = Data::new(CartItemQuantity {
            id: item_id.clone(),
            quantity,
        });
        let path = format!("/v2/carts/{cart_id}/items/{item_id}");
        let request = self.request(Method::PUT, &path).await?.json(&body);
        self.send(request).await?;
        Ok(())
    }

    /// Remove an item from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id, item_id = %item_id))]
    pub async fn delete_cart_item(
        &self,
        cart_id: &CartId,
        item_id: &CartItemId,
    ) -> Result<(), EpccError> {
        let path = format!("/v2/carts/{cart_id}/items/{item_id}");
        let request = self.request(Method::DELETE, &path).await?;
        self.send(request).await?;
        Ok(())
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// Convert a cart into an order.
    ///
    /// Returns `None` when EPCC answers without an order document.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, checkout), fields(cart_id = %cart_id))]
    pub async fn checkout(
        &self,
        cart_id: &CartId,
        checkout: &CheckoutRequest,
    ) -> Result<Option<Order>, EpccError> {
        let path = format!("/v2/carts/{cart_id}/checkout");
        let request = self
            .request(Method::POST, &path)
            .await?
            .json(&Data::new(checkout));
        let order: MaybeData<Order> = self.execute(request).await?;
        Ok(order.data)
    }

    /// Pay for an order through the manual gateway.
    ///
    /// Returns `None` when EPCC answers without a transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn pay_manual(
        &self,
        order_id: &OrderId,
    ) -> Result<Option<PaymentTransaction>, EpccError> {
        let path = format!("/v2/orders/{order_id}/payments");
        let request = self
            .request(Method::POST, &path)
            .await?
            .json(&Data::new(ManualPayment::default()));
        let payment: MaybeData<PaymentTransaction> = self.execute(request).await?;
        Ok(payment.data)
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// List catalog products with their main images.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<ProductList, EpccError> {
        let request = self
            .request(Method::GET, "/catalog/products?include=main_image")
            .await?;
        let products: ProductList = self.execute(request).await?;

        debug!(count = products.data.len(), "Fetched catalog products");
        Ok(products)
    }
}
