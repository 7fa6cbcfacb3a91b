//! Checkout route handlers.
//!
//! Checkout state belongs to the browser's shopper, so a completed order
//! stays visible until the shopper clears it.

use axum::{Json, extract::State, http::StatusCode};
use tower_sessions::Session;
use tracing::instrument;

use epcc_storefront_core::CheckoutRequest;

use crate::error::Result;
use crate::session::{CheckoutSnapshot, CompletedOrder};
use crate::state::AppState;

/// Current checkout phase, order and error.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CheckoutSnapshot>> {
    let shopper = state.shopper(&session).await?;
    Ok(Json(shopper.checkout.snapshot().await))
}

/// Place an order for the browser's cart.
///
/// On success the shopper's cart ID is dropped, so the next cart view starts
/// a new cart.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CompletedOrder>)> {
    let shopper = state.shopper(&session).await?;
    let completed = shopper.checkout.submit(request).await?;
    Ok((StatusCode::CREATED, Json(completed)))
}

/// Forget the last order so the shopper can check out again.
#[instrument(skip_all)]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<CheckoutSnapshot>> {
    let shopper = state.shopper(&session).await?;
    shopper.checkout.clear().await;
    Ok(Json(shopper.checkout.snapshot().await))
}
