//! Terminal-failure audit recording.
//!
//! A rejected order's reservation transaction has already rolled back by the
//! time this runs, so the audit row is written as its own unit of work; it is
//! the only durable trace of the failed attempt.

use crate::error::OrderError;
use crate::store::ReservationStore;
use crate::types::{OrderId, OrderRequest, OrderStatus};
use std::sync::Arc;

/// Why an order terminally failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Demand exceeded available stock
    OutOfStock,
    /// Optimistic retries exhausted by concurrent writers
    Conflict,
}

impl FailureReason {
    /// The order status recorded for this reason.
    #[must_use]
    pub const fn status(self) -> OrderStatus {
        match self {
            Self::OutOfStock => OrderStatus::FailedOutOfStock,
            Self::Conflict => OrderStatus::FailedConflict,
        }
    }
}

/// Records classified terminal failures as append-only order rows.
pub struct FailureAudit {
    store: Arc<dyn ReservationStore>,
}

impl FailureAudit {
    /// Create a recorder over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self { store }
    }

    /// Insert exactly one failure order row for `request`.
    ///
    /// Best-effort, single statement, no retry: a failure here is
    /// infrastructural and surfaced directly rather than masked behind the
    /// business rejection it was meant to record.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the insert fails.
    pub async fn record(
        &self,
        request: &OrderRequest,
        reason: FailureReason,
    ) -> Result<OrderId, OrderError> {
        let status = reason.status();
        let order_id = self.store.record_failure(request, status).await?;

        tracing::warn!(
            order_id = %order_id,
            product_id = %request.product_id,
            quantity = request.quantity,
            user_id = %request.user_id,
            status = status.as_str(),
            "order failure recorded"
        );
        metrics::counter!("stockgate_order_failures_total", "status" => status.as_str())
            .increment(1);

        Ok(order_id)
    }
}
