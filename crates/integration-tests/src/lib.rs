//! Integration test support for the EPCC storefront.
//!
//! Tests run the real sessions and HTTP surface against a `wiremock` stand-in
//! for the EPCC shopper API. No network access or credentials are needed.
//!
//! # Test Categories
//!
//! - `session_scenarios` - token, cart and checkout behaviour through the library
//! - `storefront_api` - the JSON HTTP surface with per-browser cookies

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Utc;
use epcc_storefront::config::{EpccConfig, StorefrontConfig};
use epcc_storefront::state::AppState;
use epcc_storefront::storage::{MemoryStore, SessionStore, keys};
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Client ID the mock token endpoint expects.
pub const CLIENT_ID: &str = "test-client";

/// A token record that is valid for the next hour.
#[must_use]
pub fn valid_token(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires": Utc::now().timestamp() + 3600,
        "expires_in": 3600,
        "identifier": "implicit",
        "client_id": CLIENT_ID
    })
}

/// A token record that expired a minute ago.
#[must_use]
pub fn expired_token(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "expires": Utc::now().timestamp() - 60,
        "identifier": "implicit"
    })
}

/// A `GET /v2/carts/{id}?include=items` body.
///
/// Items are `(item_id, product_id, quantity)`.
#[must_use]
pub fn cart_body(cart_id: &str, items: &[(&str, &str, u32)], total: Option<&str>) -> Value {
    let included: Vec<Value> = items
        .iter()
        .map(|(id, product_id, quantity)| {
            json!({
                "id": id,
                "type": "cart_item",
                "product_id": product_id,
                "name": format!("Product {product_id}"),
                "quantity": quantity
            })
        })
        .collect();
    let refs: Vec<Value> = items
        .iter()
        .map(|(id, _, _)| json!({"id": id, "type": "cart_item"}))
        .collect();

    let mut cart = json!({
        "id": cart_id,
        "type": "cart",
        "name": "Cart",
        "relationships": {"items": {"data": refs}}
    });
    if let Some(total) = total {
        cart["meta"] = json!({"display_price": {"with_tax": {
            "amount": 0, "currency": "USD", "formatted": total
        }}});
    }

    json!({"data": cart, "included": {"items": included}})
}

/// A store pre-loaded with a valid token and, optionally, a cart ID.
pub async fn seeded_store(cart_id: Option<&str>) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store
        .set(keys::CREDENTIALS, valid_token("seeded-token"))
        .await
        .expect("seed token");
    if let Some(cart_id) = cart_id {
        store
            .set(keys::CART_ID, json!(cart_id))
            .await
            .expect("seed cart id");
    }
    store
}

// =============================================================================
// MockEpcc
// =============================================================================

/// A mock EPCC API.
pub struct MockEpcc {
    pub server: MockServer,
}

impl MockEpcc {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Client configuration pointing at this server.
    #[must_use]
    pub fn config(&self) -> EpccConfig {
        EpccConfig::new(self.server.uri(), CLIENT_ID)
    }

    /// Answer token requests with `access_token`, expecting exactly `times` calls.
    pub async fn mount_token(&self, access_token: &str, times: u64) {
        Mock::given(method("POST"))
            .and(path("/oauth/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(valid_token(access_token)))
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Answer cart creation with `cart_id`.
    pub async fn mount_create_cart(&self, cart_id: &str) {
        Mock::given(method("POST"))
            .and(path("/v2/carts"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"data": {"id": cart_id, "type": "cart", "name": "Cart"}})),
            )
            .mount(&self.server)
            .await;
    }

    /// Answer cart fetches for `cart_id` with `body`.
    pub async fn mount_cart(&self, cart_id: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(format!("/v2/carts/{cart_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Respond to `verb path` with `status` and `body`.
    pub async fn mount(&self, verb: &str, route: &str, status: u16, body: Value) {
        Mock::given(method(verb))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Every request received so far.
    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// `"METHOD /path"` for every request received so far, in order.
    pub async fn request_log(&self) -> Vec<String> {
        self.requests()
            .await
            .iter()
            .map(|r| format!("{} {}", r.method, r.url.path()))
            .collect()
    }
}

// =============================================================================
// TestApp
// =============================================================================

/// The storefront HTTP surface served on an ephemeral port.
pub struct TestApp {
    pub addr: SocketAddr,
    /// Client with a cookie jar, so it behaves as one browser.
    pub client: reqwest::Client,
}

impl TestApp {
    /// Serve the storefront against `epcc` with a fresh token store.
    pub async fn spawn(epcc: EpccConfig) -> Self {
        let config = StorefrontConfig {
            host: "127.0.0.1".parse().expect("loopback address"),
            port: 0,
            base_url: "http://localhost".to_string(),
            epcc,
            sentry_dsn: None,
            sentry_environment: None,
        };
        let app = epcc_storefront::app(AppState::new(config));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener address");
        tokio::spawn(async move { axum::serve(listener, app).await });

        Self {
            addr,
            client: Self::browser(),
        }
    }

    /// A new client with its own cookie jar.
    #[must_use]
    pub fn browser() -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create HTTP client")
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}
