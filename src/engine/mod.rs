//! The order-placement engine.
//!
//! Hands each inbound request to one of two reservation protocols against the
//! injected [`ReservationStore`]:
//!
//! - **Pessimistic**: one transaction that serializes writers on an exclusive
//!   row lock; no retries needed.
//! - **Optimistic**: lock-free attempts guarded by a version compare-and-swap,
//!   retried with exponential backoff up to a fixed bound; each attempt is a
//!   brand-new transaction.
//!
//! Terminal business failures are classified and recorded through
//! [`FailureAudit`] after their reservation transaction rolled back.

use crate::error::OrderError;
use crate::store::ReservationStore;
use crate::types::{OrderRequest, PlacedOrder};
use std::sync::Arc;

pub mod audit;
pub mod backoff;

pub use audit::{FailureAudit, FailureReason};
pub use backoff::{ExponentialBackoff, NoDelay, RetryDelay};

/// Total optimistic attempts per request, first try included.
pub const MAX_ATTEMPTS: u32 = 3;

/// Drives order placement through the reservation protocols.
pub struct OrderEngine {
    store: Arc<dyn ReservationStore>,
    delay: Arc<dyn RetryDelay>,
    audit: FailureAudit,
    max_attempts: u32,
}

impl OrderEngine {
    /// Create an engine with the production backoff schedule.
    #[must_use]
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self::with_delay(store, Arc::new(ExponentialBackoff))
    }

    /// Create an engine with a custom retry delay (zero-delay in tests).
    #[must_use]
    pub fn with_delay(store: Arc<dyn ReservationStore>, delay: Arc<dyn RetryDelay>) -> Self {
        let audit = FailureAudit::new(store.clone());
        Self {
            store,
            delay,
            audit,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Place an order by serializing on an exclusive row lock.
    ///
    /// # Errors
    ///
    /// [`OrderError::NotFound`] for an unknown product (no audit row),
    /// [`OrderError::InsufficientStock`] when stock is short (one
    /// `FAILED_OUT_OF_STOCK` audit row), or [`OrderError::Storage`] on
    /// infrastructure failure, including failure of the audit write itself.
    pub async fn place_pessimistic(
        &self,
        request: &OrderRequest,
    ) -> Result<PlacedOrder, OrderError> {
        match self.store.reserve_locked(request).await {
            Ok(placed) => {
                record_placed(request, "pessimistic");
                Ok(placed)
            }
            Err(err @ OrderError::InsufficientStock { .. }) => {
                self.audit.record(request, FailureReason::OutOfStock).await?;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Place an order via version-guarded attempts with bounded retry.
    ///
    /// On conflict, sleeps per the injected backoff and starts a brand-new
    /// transaction; the rolled-back attempt is never resumed. Insufficient
    /// stock is terminal immediately, regardless of attempts remaining.
    ///
    /// # Errors
    ///
    /// As [`place_pessimistic`], plus [`OrderError::Conflict`] once all
    /// attempts are exhausted (one `FAILED_CONFLICT` audit row).
    ///
    /// [`place_pessimistic`]: OrderEngine::place_pessimistic
    pub async fn place_optimistic(&self, request: &OrderRequest) -> Result<PlacedOrder, OrderError> {
        let mut attempt = 1;
        loop {
            match self.store.reserve_versioned(request).await {
                Ok(placed) => {
                    record_placed(request, "optimistic");
                    return Ok(placed);
                }
                Err(OrderError::Conflict(_)) if attempt < self.max_attempts => {
                    tracing::warn!(
                        product_id = %request.product_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        "optimistic lock conflict, retrying"
                    );
                    metrics::counter!("stockgate_order_conflicts_total").increment(1);
                    self.delay.wait(attempt).await;
                    attempt += 1;
                }
                Err(err @ OrderError::Conflict(_)) => {
                    metrics::counter!("stockgate_order_conflicts_total").increment(1);
                    self.audit.record(request, FailureReason::Conflict).await?;
                    return Err(err);
                }
                Err(err @ OrderError::InsufficientStock { .. }) => {
                    self.audit.record(request, FailureReason::OutOfStock).await?;
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn record_placed(request: &OrderRequest, protocol: &'static str) {
    tracing::info!(
        product_id = %request.product_id,
        quantity = request.quantity,
        user_id = %request.user_id,
        protocol,
        "order placed"
    );
    metrics::counter!("stockgate_orders_placed_total", "protocol" => protocol).increment(1);
}
