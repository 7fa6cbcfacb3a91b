//! Cart route handlers.
//!
//! The browser session names a shopper whose cart lives in process memory.
//! Every handler answers with a fresh [`CartSnapshot`] taken after the
//! operation's re-fetch.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use epcc_storefront_core::{CartItemId, ProductId};

use crate::error::{AppError, Result};
use crate::session::CartSnapshot;
use crate::state::AppState;

/// Body of `POST /api/cart/items`.
#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Body of `PUT /api/cart/items/{item_id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// Show the shopper's cart, creating one on first visit.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartSnapshot>> {
    let shopper = state.shopper(&session).await?;
    shopper.cart.refresh().await?;
    Ok(Json(shopper.cart.snapshot().await))
}

/// Add a product to the cart.
#[instrument(skip(state, session), fields(product_id = %request.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartSnapshot>)> {
    if request.quantity == 0 {
        return Err(AppError::BadRequest(
            "quantity must be at least 1".to_string(),
        ));
    }

    let shopper = state.shopper(&session).await?;
    let cart = &shopper.cart;
    // A browser that has not viewed its cart yet has no cart ID
    if cart.cart_id().await?.is_none() {
        cart.refresh().await?;
    }
    cart.add_item(request.product_id, request.quantity).await?;

    Ok((StatusCode::CREATED, Json(cart.snapshot().await)))
}

/// Set an item's quantity; zero or less removes it.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<String>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<CartSnapshot>> {
    let shopper = state.shopper(&session).await?;
    shopper
        .cart
        .set_quantity(CartItemId::new(item_id), request.quantity)
        .await?;
    Ok(Json(shopper.cart.snapshot().await))
}

/// Remove an item from the cart.
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Path(item_id): Path<String>,
) -> Result<Json<CartSnapshot>> {
    let shopper = state.shopper(&session).await?;
    shopper.cart.remove_item(CartItemId::new(item_id)).await?;
    Ok(Json(shopper.cart.snapshot().await))
}
