//! Router configuration.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{orders, products};
use axum::{
    routing::{get, post},
    Router,
};

/// Build the complete Axum router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Product lookup and baseline reset
        .route("/products/:id", get(products::get_product))
        .route("/products/reset", post(products::reset_inventory))
        // Order placement (caller selects the protocol)
        .route("/orders/pessimistic", post(orders::place_order_pessimistic))
        .route("/orders/optimistic", post(orders::place_order_optimistic))
        // Order queries
        .route("/orders/stats", get(orders::get_order_stats))
        .route("/orders/:id", get(orders::get_order));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .with_state(state)
}
