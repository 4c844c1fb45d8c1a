//! Order placement and query endpoints.
//!
//! - `POST /api/orders/pessimistic` - Place an order via the exclusive-lock protocol
//! - `POST /api/orders/optimistic` - Place an order via the version-guarded protocol
//! - `GET /api/orders/stats` - Aggregate outcome counts
//! - `GET /api/orders/:id` - Look up one order

use crate::server::error::ApiError;
use crate::server::state::AppState;
use crate::types::{Order, OrderId, OrderRequest, OrderStats, PlacedOrder, ProductId};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

/// Request to place an order.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    /// Target product
    pub product_id: ProductId,
    /// Units requested
    pub quantity: i32,
    /// Requesting user
    pub user_id: String,
}

impl PlaceOrderRequest {
    /// Validate and convert into the engine's request type.
    fn into_order_request(self) -> Result<OrderRequest, ApiError> {
        if self.quantity < 1 {
            return Err(ApiError::bad_request("Quantity must be greater than 0"));
        }
        if self.user_id.is_empty() {
            return Err(ApiError::bad_request("User id must not be empty"));
        }
        Ok(OrderRequest {
            product_id: self.product_id,
            quantity: self.quantity,
            user_id: self.user_id,
        })
    }
}

/// Place an order by serializing writers on an exclusive row lock.
///
/// # Example
///
/// ```bash
/// curl -X POST http://localhost:8080/api/orders/pessimistic \
///   -H "Content-Type: application/json" \
///   -d '{"productId": 1, "quantity": 2, "userId": "alice"}'
/// ```
pub async fn place_order_pessimistic(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>), ApiError> {
    let request = request.into_order_request()?;
    let placed = state.engine.place_pessimistic(&request).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

/// Place an order via version-guarded attempts with bounded retry.
///
/// Responds 409 once retries are exhausted; unlike a 400, the same request may
/// succeed if resubmitted later.
pub async fn place_order_optimistic(
    State(state): State<AppState>,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>), ApiError> {
    let request = request.into_order_request()?;
    let placed = state.engine.place_optimistic(&request).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

/// Aggregate outcome counts over all recorded orders.
pub async fn get_order_stats(
    State(state): State<AppState>,
) -> Result<Json<OrderStats>, ApiError> {
    let stats = state.store.order_stats().await?;
    Ok(Json(stats))
}

/// Look up one order by id.
pub async fn get_order(
    Path(order_id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<Order>, ApiError> {
    let order = state
        .store
        .get_order(OrderId(order_id))
        .await?
        .ok_or_else(|| ApiError::not_found("Order", order_id))?;
    Ok(Json(order))
}
