//! Catalog listing.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::Result;
use crate::session::ProductSnapshot;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProductsQuery {
    /// Refetch even if the catalog is already loaded.
    #[serde(default)]
    pub refresh: bool,
}

/// List catalog products with prices and main image links.
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<ProductSnapshot>> {
    let products = state.products();
    if query.refresh {
        products.refetch().await?;
    } else {
        products.load().await?;
    }
    Ok(Json(products.snapshot().await))
}
