//! Product lookup and inventory reset endpoints.

use crate::server::error::ApiError;
use crate::server::state::AppState;
use crate::types::{Product, ProductId};
use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

/// Look up one product by id.
pub async fn get_product(
    Path(product_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .store
        .get_product(ProductId(product_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))?;
    Ok(Json(product))
}

/// Confirmation of an inventory reset.
#[derive(Serialize)]
pub struct ResetResponse {
    /// Human-readable confirmation
    pub message: String,
}

/// Restore the seeded baseline inventory and clear all orders.
///
/// Utility endpoint for returning to a known state between load runs.
pub async fn reset_inventory(
    State(state): State<AppState>,
) -> Result<Json<ResetResponse>, ApiError> {
    state.store.reset_inventory().await?;
    Ok(Json(ResetResponse {
        message: "Product inventory reset successfully.".to_string(),
    }))
}
