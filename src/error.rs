//! Order placement error taxonomy.
//!
//! Every failure a protocol can raise carries an explicit classification so
//! the retry loop and the HTTP layer branch on structure, never on message
//! text. Only [`OrderError::Conflict`] is retryable.

use crate::types::ProductId;
use thiserror::Error;

/// Classified failure of an order placement or store operation.
#[derive(Debug, Clone, Error)]
pub enum OrderError {
    /// The referenced product does not exist. Terminal; no audit row is
    /// written because no reservation ever existed to fail.
    #[error("product {0} not found")]
    NotFound(ProductId),

    /// Demand exceeded available stock at decision time. Terminal; produces a
    /// `FAILED_OUT_OF_STOCK` audit row.
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product that was out of stock
        product_id: ProductId,
        /// Units the caller asked for
        requested: i32,
        /// Units actually available when the check ran
        available: i32,
    },

    /// The optimistic conditional update lost a race to a concurrent writer.
    /// Retryable up to the attempt bound; on exhaustion the engine records a
    /// `FAILED_CONFLICT` audit row and surfaces this as terminal.
    #[error("concurrent modification of product {0}")]
    Conflict(ProductId),

    /// Infrastructure failure: store unreachable, pool exhausted, statement
    /// failed. Always terminal, never retried, never audited as a business
    /// outcome.
    #[error("storage error: {0}")]
    Storage(String),
}

impl OrderError {
    /// Whether a fresh attempt may succeed where this one failed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Wrap a database error with operation context.
    pub(crate) fn storage(context: &str, err: sqlx::Error) -> Self {
        Self::Storage(format!("{context}: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_conflict_is_retryable() {
        assert!(OrderError::Conflict(ProductId(1)).is_retryable());
        assert!(!OrderError::NotFound(ProductId(1)).is_retryable());
        assert!(!OrderError::InsufficientStock {
            product_id: ProductId(1),
            requested: 5,
            available: 2,
        }
        .is_retryable());
        assert!(!OrderError::Storage("pool exhausted".to_string()).is_retryable());
    }
}
