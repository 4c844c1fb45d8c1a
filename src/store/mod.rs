//! Store abstraction and implementations.
//!
//! [`ReservationStore`] is the seam between the reservation protocols and the
//! underlying data store: the engine drives retries and failure audit against
//! this trait, so protocols can be exercised against a substitute store in
//! tests. [`postgres::PgStore`] is the authoritative implementation.

use crate::error::OrderError;
use crate::types::{
    Order, OrderId, OrderRequest, OrderStats, OrderStatus, PlacedOrder, Product, ProductId,
};
use async_trait::async_trait;

#[cfg(feature = "test-utils")]
pub mod memory;
pub mod postgres;

#[cfg(feature = "test-utils")]
pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Operations the reservation engine needs from the data store.
///
/// The two `reserve_*` methods each run exactly one transaction and perform
/// no retries of their own; retry policy belongs to the engine.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Reserve stock under an exclusive row lock (pessimistic protocol).
    ///
    /// Locks the product row, checks stock, decrements it and inserts a
    /// `SUCCESS` order row, all in one transaction. Conflicting writers queue
    /// on the lock rather than race.
    ///
    /// # Errors
    ///
    /// [`OrderError::NotFound`] if the product does not exist,
    /// [`OrderError::InsufficientStock`] if stock is short (the transaction is
    /// rolled back), or [`OrderError::Storage`] on infrastructure failure.
    async fn reserve_locked(&self, request: &OrderRequest) -> Result<PlacedOrder, OrderError>;

    /// One optimistic reservation attempt: unlocked read, then a
    /// version-guarded conditional decrement.
    ///
    /// # Errors
    ///
    /// [`OrderError::Conflict`] if another writer committed between the read
    /// and the conditional update; otherwise as [`reserve_locked`].
    ///
    /// [`reserve_locked`]: ReservationStore::reserve_locked
    async fn reserve_versioned(&self, request: &OrderRequest) -> Result<PlacedOrder, OrderError>;

    /// Append a terminal-failure order row outside any transaction.
    ///
    /// Runs as a single statement so it survives the reservation transaction's
    /// rollback. `status` must be one of the `FAILED_*` variants.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the insert fails.
    async fn record_failure(
        &self,
        request: &OrderRequest,
        status: OrderStatus,
    ) -> Result<OrderId, OrderError>;

    /// Look up a product by id.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the query fails.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, OrderError>;

    /// Look up an order by id.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the query fails.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, OrderError>;

    /// Aggregate counts over the orders table.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the query fails.
    async fn order_stats(&self) -> Result<OrderStats, OrderError>;

    /// Restore the seeded baseline inventory and clear all orders.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the reset transaction fails.
    async fn reset_inventory(&self) -> Result<(), OrderError>;

    /// Whether the store is reachable. Used by the readiness probe.
    async fn ping(&self) -> bool;
}
