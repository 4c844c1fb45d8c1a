//! Core domain types for order placement.
//!
//! Identifiers are thin newtypes over the database's `BIGSERIAL` keys so a
//! product id can never be passed where an order id is expected.

use crate::error::OrderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a product row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an order row, generated on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub i64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One stock-keeping unit.
///
/// `version` increases by exactly 1 on every committed stock mutation and is
/// the guard value for the optimistic protocol's conditional update.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    /// Product identifier
    pub id: ProductId,
    /// Units currently available; never negative in any committed state
    pub stock: i32,
    /// Monotonically increasing mutation counter
    pub version: i32,
}

/// Terminal outcome of one placement attempt, as stored in the orders table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Stock was decremented and the order committed
    Success,
    /// Demand exceeded available stock at decision time
    FailedOutOfStock,
    /// Optimistic retries were exhausted by concurrent writers
    FailedConflict,
}

impl OrderStatus {
    /// Convert status to its database string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::FailedOutOfStock => "FAILED_OUT_OF_STOCK",
            Self::FailedConflict => "FAILED_CONFLICT",
        }
    }

    /// Parse status from its database string representation.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the string doesn't match a known status.
    pub fn parse(s: &str) -> Result<Self, OrderError> {
        match s {
            "SUCCESS" => Ok(Self::Success),
            "FAILED_OUT_OF_STOCK" => Ok(Self::FailedOutOfStock),
            "FAILED_CONFLICT" => Ok(Self::FailedConflict),
            _ => Err(OrderError::Storage(format!("invalid order status: {s}"))),
        }
    }
}

/// An order row. Append-only: created exactly once, never edited.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order identifier
    pub id: OrderId,
    /// Product the order was placed against
    pub product_id: ProductId,
    /// Requested quantity
    pub quantity_ordered: i32,
    /// User who placed the order
    pub user_id: String,
    /// Terminal outcome
    pub status: OrderStatus,
    /// Insert timestamp (implicit ordering key)
    pub created_at: DateTime<Utc>,
}

/// An inbound order placement request.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// Target product
    pub product_id: ProductId,
    /// Units requested; callers must validate `quantity >= 1`
    pub quantity: i32,
    /// Requesting user
    pub user_id: String,
}

/// Result of a successful placement.
///
/// `new_version` is populated only by the optimistic protocol; the pessimistic
/// protocol does not observe the version column.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    /// Identifier of the inserted `SUCCESS` order row
    pub order_id: OrderId,
    /// Product the order was placed against
    pub product_id: ProductId,
    /// Units reserved
    pub quantity_ordered: i32,
    /// Stock remaining after the decrement
    pub stock_remaining: i32,
    /// Product version after the conditional update (optimistic only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_version: Option<i32>,
}

/// Aggregate counts over the orders table.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    /// All order rows
    pub total_orders: i64,
    /// Rows with status `SUCCESS`
    pub successful_orders: i64,
    /// Rows with status `FAILED_OUT_OF_STOCK`
    pub failed_out_of_stock: i64,
    /// Rows with status `FAILED_CONFLICT`
    pub failed_conflict: i64,
}
