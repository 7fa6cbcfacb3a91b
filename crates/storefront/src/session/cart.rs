//! Cart session: cart ID tracking, fetch and mutate-then-resync.

use std::borrow::Cow;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

use epcc_storefront_core::{CartId, CartItemId, EMPTY_TOTAL, ProductId};

use super::{InFlight, SessionError};
use crate::epcc::{Cart, CartItem, EpccClient};
use crate::storage::{self, SessionStore, keys};

#[derive(Debug, Default)]
struct CartState {
    cart: Option<Cart>,
    items: Vec<CartItem>,
    error: Option<String>,
    last_added_product: Option<ProductId>,
}

fn lock_adding(lock: &StdMutex<Option<ProductId>>) -> MutexGuard<'_, Option<ProductId>> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Records the product being added until dropped.
struct AddingGuard<'a> {
    adding: &'a StdMutex<Option<ProductId>>,
}

impl<'a> AddingGuard<'a> {
    fn start(lock: &'a StdMutex<Option<ProductId>>, product_id: ProductId) -> Self {
        *lock_adding(lock) = Some(product_id);
        Self { adding: lock }
    }
}

impl Drop for AddingGuard<'_> {
    fn drop(&mut self) {
        *lock_adding(self.adding) = None;
    }
}

/// Point-in-time view of a [`CartSession`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct CartSnapshot {
    pub cart: Option<Cart>,
    pub items: Vec<CartItem>,
    /// Sum of item quantities.
    pub item_count: u32,
    /// Formatted total including tax, or `$0.00`.
    pub total_amount: String,
    pub loading: bool,
    pub error: Option<String>,
    pub adding_product: Option<ProductId>,
    pub last_added_product: Option<ProductId>,
}

/// A shopper's cart.
///
/// The cart ID is read from and written to the injected store under
/// [`keys::CART_ID`]. Every mutation is followed by a full re-fetch; there
/// are no optimistic updates.
pub struct CartSession {
    client: EpccClient,
    store: Arc<dyn SessionStore>,
    state: RwLock<CartState>,
    loading: InFlight,
    adding: StdMutex<Option<ProductId>>,
    create_lock: Mutex<()>,
}

impl CartSession {
    #[must_use]
    pub fn new(client: EpccClient, store: Arc<dyn SessionStore>) -> Self {
        Self {
            client,
            store,
            state: RwLock::new(CartState::default()),
            loading: InFlight::default(),
            adding: StdMutex::new(None),
            create_lock: Mutex::new(()),
        }
    }

    /// The persisted cart ID, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn cart_id(&self) -> Result<Option<CartId>, SessionError> {
        Ok(storage::load(self.store.as_ref(), keys::CART_ID).await?)
    }

    /// Return the persisted cart ID, creating and persisting a cart if none
    /// exists. Concurrent callers on one session share a single creation.
    ///
    /// # Errors
    ///
    /// Returns an error if cart creation or the store fails.
    pub async fn ensure_cart(&self) -> Result<CartId, SessionError> {
        if let Some(id) = self.cart_id().await? {
            return Ok(id);
        }

        let _guard = self.create_lock.lock().await;
        if let Some(id) = self.cart_id().await? {
            return Ok(id);
        }

        let cart = self.client.create_cart().await?;
        storage::save(self.store.as_ref(), keys::CART_ID, &cart.id).await?;
        tracing::info!(cart_id = %cart.id, "Created shopper cart");
        Ok(cart.id)
    }

    /// Ensure a cart exists, then replace local state with a fresh fetch.
    ///
    /// # Errors
    ///
    /// Returns an error if cart creation, the fetch or the store fails.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), SessionError> {
        self.state.write().await.error = None;

        let result = {
            let _loading = self.loading.enter();
            async {
                let cart_id = self.ensure_cart().await?;
                self.reload(&cart_id).await
            }
            .await
        };

        self.record(result).await
    }

    /// Add `quantity` of a product, then re-fetch.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCart` if no cart ID is persisted, or the
    /// underlying EPCC error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<(), SessionError> {
        self.state.write().await.error = None;

        let result = {
            let _adding = AddingGuard::start(&self.adding, product_id.clone());
            async {
                let cart_id = self.cart_id().await?.ok_or(SessionError::NoCart)?;
                self.client
                    .add_cart_item(&cart_id, &product_id, quantity)
                    .await?;
                self.reload(&cart_id).await
            }
            .await
        };

        if result.is_ok() {
            self.state.write().await.last_added_product = Some(product_id);
        }
        self.record(result).await
    }

    /// Set an item's quantity, then re-fetch. A quantity of zero or less
    /// removes the item.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCart` if no cart ID is persisted, or the
    /// underlying EPCC error.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn set_quantity(&self, item_id: CartItemId, quantity: i64) -> Result<(), SessionError> {
        if quantity <= 0 {
            return self.remove_item(item_id).await;
        }
        self.state.write().await.error = None;

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        let result = async {
            let cart_id = self.cart_id().await?.ok_or(SessionError::NoCart)?;
            self.client
                .update_cart_item(&cart_id, &item_id, quantity)
                .await?;
            self.reload(&cart_id).await
        }
        .await;

        self.record(result).await
    }

    /// Remove an item, then re-fetch.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoCart` if no cart ID is persisted, or the
    /// underlying EPCC error.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn remove_item(&self, item_id: CartItemId) -> Result<(), SessionError> {
        self.state.write().await.error = None;

        let result = async {
            let cart_id = self.cart_id().await?.ok_or(SessionError::NoCart)?;
            self.client.delete_cart_item(&cart_id, &item_id).await?;
            self.reload(&cart_id).await
        }
        .await;

        self.record(result).await
    }

    /// A cloned view of the current state with derived totals.
    pub async fn snapshot(&self) -> CartSnapshot {
        let loading = self.loading.is_active();
        let adding_product = lock_adding(&self.adding).clone();
        let state = self.state.read().await;

        let total_amount = state
            .cart
            .as_ref()
            .and_then(Cart::total_with_tax)
            .map_or_else(|| EMPTY_TOTAL.to_string(), Cow::into_owned);

        CartSnapshot {
            cart: state.cart.clone(),
            items: state.items.clone(),
            item_count: state
                .items
                .iter()
                .fold(0, |count: u32, i| count.saturating_add(i.quantity)),
            total_amount,
            loading,
            error: state.error.clone(),
            adding_product,
            last_added_product: state.last_added_product.clone(),
        }
    }

    async fn reload(&self, cart_id: &CartId) -> Result<(), SessionError> {
        let (cart, items) = self.client.get_cart(cart_id).await?.into_parts();

        let mut state = self.state.write().await;
        state.cart = Some(cart);
        state.items = items;
        Ok(())
    }

    async fn record<T>(&self, result: Result<T, SessionError>) -> Result<T, SessionError> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Cart operation failed");
            self.state.write().await.error = Some(e.to_string());
        }
        result
    }
}

impl std::fmt::Debug for CartSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartSession").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use serde_json::json;
    use tokio::time::{sleep, timeout};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::EpccConfig;
    use crate::storage::MemoryStore;

    async fn session(server: &MockServer, cart_id: Option<&str>) -> (CartSession, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                keys::CREDENTIALS,
                json!({"access_token": "tok", "expires": Utc::now().timestamp() + 3600}),
            )
            .await
            .unwrap();
        if let Some(id) = cart_id {
            store.set(keys::CART_ID, json!(id)).await.unwrap();
        }

        let client = EpccClient::new(EpccConfig::new(server.uri(), "client-abc"), store.clone());
        (CartSession::new(client, store.clone()), store)
    }

    fn cart_body(quantities: &[u32]) -> serde_json::Value {
        let items: Vec<_> = quantities
            .iter()
            .enumerate()
            .map(|(i, q)| json!({"id": format!("item-{i}"), "product_id": format!("prod-{i}"), "quantity": q}))
            .collect();
        json!({
            "data": {
                "id": "cart-1",
                "meta": {"display_price": {"with_tax": {"amount": 1500, "currency": "USD", "formatted": "$15.00"}}}
            },
            "included": {"items": items}
        })
    }

    #[tokio::test]
    async fn test_refresh_creates_cart_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/carts"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": "cart-1"}})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/carts/cart-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_body(&[2, 3])))
            .mount(&server)
            .await;

        let (session, store) = session(&server, None).await;
        let (a, b) = tokio::join!(session.refresh(), session.refresh());
        a.unwrap();
        b.unwrap();

        assert_eq!(store.get(keys::CART_ID).await.unwrap(), Some(json!("cart-1")));
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.item_count, 5);
        assert_eq!(snapshot.total_amount, "$15.00");
        assert!(!snapshot.loading);
        assert!(snapshot.error.is_none());
    }

    #[tokio::test]
    async fn test_empty_snapshot_defaults() {
        let server = MockServer::start().await;
        let (session, _) = session(&server, None).await;

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.item_count, 0);
        assert_eq!(snapshot.total_amount, EMPTY_TOTAL);
        assert!(snapshot.cart.is_none());
    }

    #[tokio::test]
    async fn test_add_item_without_cart_records_error() {
        let server = MockServer::start().await;
        let (session, _) = session(&server, None).await;

        let err = session
            .add_item(ProductId::new("prod-1"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NoCart));

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.error.as_deref(), Some("No cart found"));
        assert!(snapshot.adding_product.is_none());
        assert!(snapshot.last_added_product.is_none());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_quantity_updates_then_refetches() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v2/carts/cart-1/items/item-0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/carts/cart-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_body(&[4])))
            .expect(1)
            .mount(&server)
            .await;

        let (session, _) = session(&server, Some("cart-1")).await;
        session
            .set_quantity(CartItemId::new("item-0"), 4)
            .await
            .unwrap();
        assert_eq!(session.snapshot().await.items[0].quantity, 4);
    }

    #[tokio::test]
    async fn test_failed_fetch_sets_error_and_clears_on_next_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/carts/cart-1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/carts/cart-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_body(&[1])))
            .mount(&server)
            .await;

        let (session, _) = session(&server, Some("cart-1")).await;
        assert!(session.refresh().await.is_err());
        let failed = session.snapshot().await;
        assert!(failed.error.unwrap().contains("503"));
        assert!(!failed.loading);

        session.refresh().await.unwrap();
        assert!(session.snapshot().await.error.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_operations_reset_in_flight_flags() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/carts/cart-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(cart_body(&[1]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v2/carts/cart-1/items"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"data": []}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let (session, _) = session(&server, Some("cart-1")).await;

        let (refresh, during) = tokio::join!(
            timeout(Duration::from_millis(100), session.refresh()),
            async {
                sleep(Duration::from_millis(30)).await;
                session.snapshot().await
            }
        );
        assert!(refresh.is_err());
        assert!(during.loading);
        assert!(!session.snapshot().await.loading);

        let (add, during) = tokio::join!(
            timeout(
                Duration::from_millis(100),
                session.add_item(ProductId::new("prod-9"), 1)
            ),
            async {
                sleep(Duration::from_millis(30)).await;
                session.snapshot().await
            }
        );
        assert!(add.is_err());
        assert_eq!(during.adding_product, Some(ProductId::new("prod-9")));

        let after = session.snapshot().await;
        assert!(after.adding_product.is_none());
        assert!(after.last_added_product.is_none());
    }

    #[tokio::test]
    async fn test_item_count_saturates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/carts/cart-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(cart_body(&[u32::MAX, 5])))
            .mount(&server)
            .await;

        let (session, _) = session(&server, Some("cart-1")).await;
        session.refresh().await.unwrap();
        assert_eq!(session.snapshot().await.item_count, u32::MAX);
    }
}
