//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Health check
//!
//! # Auth
//! GET    /api/auth/status           - Storefront token status
//!
//! # Products
//! GET    /api/products              - Catalog listing (?refresh=true refetches)
//!
//! # Cart (per browser session)
//! GET    /api/cart                  - Cart with items, creating it if needed
//! POST   /api/cart/items            - Add a product
//! PUT    /api/cart/items/{item_id}  - Set quantity (<= 0 removes)
//! DELETE /api/cart/items/{item_id}  - Remove an item
//!
//! # Checkout
//! GET    /api/checkout              - Checkout phase, order and error
//! POST   /api/checkout              - Convert the cart into an order
//! DELETE /api/checkout              - Clear a finished checkout
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Create the JSON API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/status", get(auth::status))
        .route("/products", get(products::list))
        .route("/cart", get(cart::show))
        .route("/cart/items", post(cart::add))
        .route(
            "/cart/items/{item_id}",
            put(cart::update).delete(cart::remove),
        )
        .route(
            "/checkout",
            get(checkout::show)
                .post(checkout::submit)
                .delete(checkout::clear),
        )
}

/// Build the full application with session, request-ID and trace layers.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .layer(session_layer)
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check EPCC.
async fn health() -> &'static str {
    "ok"
}
