//! Business metrics for order placement.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `stockgate_orders_placed_total{protocol}` - Successful placements by protocol
//! - `stockgate_order_failures_total{status}` - Terminal failures by recorded status
//! - `stockgate_order_conflicts_total` - Optimistic attempts lost to a version race

use metrics::describe_counter;

/// Register metric descriptions.
///
/// Call once at application startup, before any metrics are recorded.
pub fn register_order_metrics() {
    describe_counter!(
        "stockgate_orders_placed_total",
        "Successful order placements by protocol (pessimistic, optimistic)"
    );
    describe_counter!(
        "stockgate_order_failures_total",
        "Terminal order failures by recorded status"
    );
    describe_counter!(
        "stockgate_order_conflicts_total",
        "Optimistic reservation attempts that lost a version race"
    );

    tracing::info!("order metrics registered");
}
