//! Shopper session behaviour against a mock EPCC API.
//!
//! Run with: cargo test -p epcc-storefront-integration-tests

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use epcc_storefront::epcc::EpccClient;
use epcc_storefront::session::{CartSession, CheckoutSession, SessionError};
use epcc_storefront::storage::{self, FileStore, MemoryStore, SessionStore, keys};
use epcc_storefront_core::{Address, CartItemId, CheckoutRequest, Email, ProductId};
use epcc_storefront_integration_tests::{
    MockEpcc, cart_body, expired_token, seeded_store,
};
use serde_json::json;

fn cart_session(epcc: &MockEpcc, store: &Arc<MemoryStore>) -> CartSession {
    let client = EpccClient::new(epcc.config(), store.clone());
    CartSession::new(client, store.clone())
}

fn checkout_request() -> CheckoutRequest {
    CheckoutRequest::shipping_to_billing(
        Email::parse("tom@pawnee.gov").unwrap(),
        Address {
            first_name: "Tom".to_string(),
            last_name: "Haverford".to_string(),
            line_1: "7 Snake Juice Ln".to_string(),
            city: "Pawnee".to_string(),
            county: Some("Wamapoke".to_string()),
            postcode: "47998".to_string(),
            country: "US".to_string(),
            ..Address::default()
        },
    )
}

// ============================================================================
// Token lifecycle
// ============================================================================

#[tokio::test]
async fn test_add_item_without_token_fetches_and_persists_one() {
    let epcc = MockEpcc::start().await;
    epcc.mount_token("fresh-token", 1).await;
    epcc.mount("POST", "/v2/carts/cart-1/items", 201, json!({"data": []}))
        .await;
    epcc.mount_cart("cart-1", cart_body("cart-1", &[("item-1", "prod-1", 1)], Some("$10.00")))
        .await;

    let store = Arc::new(MemoryStore::new());
    store.set(keys::CART_ID, json!("cart-1")).await.unwrap();
    let cart = cart_session(&epcc, &store);

    cart.add_item(ProductId::new("prod-1"), 1).await.unwrap();

    assert_eq!(
        epcc.request_log().await,
        vec![
            "POST /oauth/access_token",
            "POST /v2/carts/cart-1/items",
            "GET /v2/carts/cart-1",
        ]
    );

    let stored = store.get(keys::CREDENTIALS).await.unwrap().unwrap();
    assert_eq!(stored["access_token"], "fresh-token");

    let snapshot = cart.snapshot().await;
    assert_eq!(
        snapshot.last_added_product,
        Some(ProductId::new("prod-1"))
    );
    assert!(snapshot.adding_product.is_none());
    assert_eq!(snapshot.item_count, 1);
    assert_eq!(snapshot.total_amount, "$10.00");
}

#[tokio::test]
async fn test_expired_token_is_replaced_before_request() {
    let epcc = MockEpcc::start().await;
    epcc.mount_token("renewed", 1).await;
    epcc.mount_cart("cart-1", cart_body("cart-1", &[], None)).await;

    let store = Arc::new(MemoryStore::new());
    store
        .set(keys::CREDENTIALS, expired_token("stale"))
        .await
        .unwrap();
    store.set(keys::CART_ID, json!("cart-1")).await.unwrap();

    cart_session(&epcc, &store).refresh().await.unwrap();

    let requests = epcc.requests().await;
    assert_eq!(requests[0].url.path(), "/oauth/access_token");
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(requests[1].headers["authorization"], "Bearer renewed");
    assert_eq!(requests[1].headers["ep-inventories-multi-location"], "true");
}

// ============================================================================
// Cart mutations
// ============================================================================

#[tokio::test]
async fn test_mutation_state_matches_one_fresh_fetch() {
    let epcc = MockEpcc::start().await;
    epcc.mount("PUT", "/v2/carts/cart-1/items/item-1", 200, json!({"data": []}))
        .await;
    let server_cart = cart_body(
        "cart-1",
        &[("item-1", "prod-1", 3), ("item-2", "prod-2", 1)],
        Some("$42.00"),
    );
    epcc.mount_cart("cart-1", server_cart).await;

    let store = seeded_store(Some("cart-1")).await;
    let cart = cart_session(&epcc, &store);
    cart.set_quantity(CartItemId::new("item-1"), 3).await.unwrap();

    let gets = epcc
        .request_log()
        .await
        .into_iter()
        .filter(|r| r == "GET /v2/carts/cart-1")
        .count();
    assert_eq!(gets, 1);

    let snapshot = cart.snapshot().await;
    let items: Vec<(&str, u32)> = snapshot
        .items
        .iter()
        .map(|i| (i.id.as_str(), i.quantity))
        .collect();
    assert_eq!(items, vec![("item-1", 3), ("item-2", 1)]);
    assert_eq!(snapshot.item_count, 4);
    assert_eq!(snapshot.total_amount, "$42.00");
}

#[tokio::test]
async fn test_zero_quantity_deletes_without_put() {
    let epcc = MockEpcc::start().await;
    epcc.mount("DELETE", "/v2/carts/cart-1/items/item-9", 200, json!({"data": []}))
        .await;
    epcc.mount_cart("cart-1", cart_body("cart-1", &[], None)).await;

    let store = seeded_store(Some("cart-1")).await;
    let cart = cart_session(&epcc, &store);
    cart.set_quantity(CartItemId::new("item-9"), 0).await.unwrap();

    assert_eq!(
        epcc.request_log().await,
        vec!["DELETE /v2/carts/cart-1/items/item-9", "GET /v2/carts/cart-1"]
    );
    assert_eq!(cart.snapshot().await.total_amount, "$0.00");
}

#[tokio::test]
async fn test_negative_quantity_is_removal() {
    let epcc = MockEpcc::start().await;
    epcc.mount("DELETE", "/v2/carts/cart-1/items/item-3", 200, json!({"data": []}))
        .await;
    epcc.mount_cart("cart-1", cart_body("cart-1", &[], None)).await;

    let store = seeded_store(Some("cart-1")).await;
    cart_session(&epcc, &store)
        .set_quantity(CartItemId::new("item-3"), -2)
        .await
        .unwrap();

    let log = epcc.request_log().await;
    assert!(log.iter().all(|r| !r.starts_with("PUT")));
    assert_eq!(log[0], "DELETE /v2/carts/cart-1/items/item-3");
}

#[tokio::test]
async fn test_upstream_error_is_recorded_and_returned() {
    let epcc = MockEpcc::start().await;
    epcc.mount(
        "POST",
        "/v2/carts/cart-1/items",
        404,
        json!({"errors": [{"status": 404, "title": "Not Found", "detail": "Product not found"}]}),
    )
    .await;

    let store = seeded_store(Some("cart-1")).await;
    let cart = cart_session(&epcc, &store);
    let err = cart
        .add_item(ProductId::new("missing"), 1)
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::Epcc(_)));
    let snapshot = cart.snapshot().await;
    assert_eq!(snapshot.error, Some(err.to_string()));
    assert!(snapshot.last_added_product.is_none());
    // No re-fetch after a failed mutation
    assert_eq!(epcc.request_log().await.len(), 1);
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_checkout_without_cart_sends_nothing() {
    let epcc = MockEpcc::start().await;
    let store = seeded_store(None).await;
    let checkout = CheckoutSession::new(EpccClient::new(epcc.config(), store.clone()), store);

    let err = checkout.submit(checkout_request()).await.unwrap_err();

    assert!(matches!(err, SessionError::NoCartToCheckout));
    assert_eq!(
        checkout.error().await.as_deref(),
        Some("No cart found. Please add items to your cart first.")
    );
    assert!(epcc.requests().await.is_empty());
}

#[tokio::test]
async fn test_checkout_clears_cart_and_next_refresh_creates_new_one() {
    let epcc = MockEpcc::start().await;
    epcc.mount(
        "POST",
        "/v2/carts/cart-1/checkout",
        201,
        json!({"data": {
            "id": "order-1",
            "type": "order",
            "status": "incomplete",
            "payment": "unpaid",
            "customer": {"name": "Tom Haverford", "email": "tom@pawnee.gov"}
        }}),
    )
    .await;
    epcc.mount_create_cart("cart-2").await;
    epcc.mount_cart("cart-2", cart_body("cart-2", &[], None)).await;

    let store = seeded_store(Some("cart-1")).await;
    let client = EpccClient::new(epcc.config(), store.clone());
    let checkout = CheckoutSession::new(client.clone(), store.clone());

    let completed = checkout.submit(checkout_request()).await.unwrap();
    assert_eq!(completed.order.id.as_ref().unwrap().as_str(), "order-1");
    assert!(checkout.is_complete().await);
    assert!(store.get(keys::CART_ID).await.unwrap().is_none());

    let checkout_body = &epcc.requests().await[0];
    let sent: serde_json::Value = serde_json::from_slice(&checkout_body.body).unwrap();
    assert_eq!(sent["data"]["customer"]["email"], "tom@pawnee.gov");
    assert_eq!(sent["data"]["shipping_address"]["county"], "Wamapoke");

    let cart = CartSession::new(client, store.clone());
    cart.refresh().await.unwrap();
    assert_eq!(
        store.get(keys::CART_ID).await.unwrap(),
        Some(json!("cart-2"))
    );
}

#[tokio::test]
async fn test_manual_payment_after_checkout() {
    let epcc = MockEpcc::start().await;
    epcc.mount(
        "POST",
        "/v2/carts/cart-1/checkout",
        201,
        json!({"data": {"id": "order-7"}}),
    )
    .await;
    epcc.mount(
        "POST",
        "/v2/orders/order-7/payments",
        201,
        json!({"data": {"id": "txn-7", "transaction_type": "purchase", "status": "complete"}}),
    )
    .await;

    let store = seeded_store(Some("cart-1")).await;
    let client = EpccClient::new(epcc.config().with_manual_payment(true), store.clone());
    let checkout = CheckoutSession::new(client, store.clone());

    let completed = checkout.submit(checkout_request()).await.unwrap();
    assert_eq!(
        completed.payment_transaction.unwrap().id.as_str(),
        "txn-7"
    );

    let payment = &epcc.requests().await[1];
    let sent: serde_json::Value = serde_json::from_slice(&payment.body).unwrap();
    assert_eq!(sent, json!({"data": {"gateway": "manual", "method": "purchase"}}));
}

// ============================================================================
// File-backed shopper state
// ============================================================================

#[tokio::test]
async fn test_file_store_shares_token_and_cart_between_runs() {
    let epcc = MockEpcc::start().await;
    epcc.mount_token("file-token", 1).await;
    epcc.mount_create_cart("cart-f").await;
    epcc.mount_cart("cart-f", cart_body("cart-f", &[], None)).await;

    let path = std::env::temp_dir().join(format!("ep-cli-{}.json", uuid::Uuid::new_v4()));

    for _ in 0..2 {
        let store = Arc::new(FileStore::new(&path));
        let cart = CartSession::new(EpccClient::new(epcc.config(), store.clone()), store);
        cart.refresh().await.unwrap();
    }

    let log = epcc.request_log().await;
    assert_eq!(log.iter().filter(|r| *r == "POST /oauth/access_token").count(), 1);
    assert_eq!(log.iter().filter(|r| *r == "POST /v2/carts").count(), 1);

    let store = FileStore::new(&path);
    let cart_id: Option<String> = storage::load(&store, keys::CART_ID).await.unwrap();
    assert_eq!(cart_id.as_deref(), Some("cart-f"));

    tokio::fs::remove_file(&path).await.unwrap();
}
