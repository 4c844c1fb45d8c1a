//! Injectable delay between optimistic retry attempts.

use async_trait::async_trait;
use std::time::Duration;

/// Base backoff unit; attempt `n` sleeps `2^n` times this.
const BACKOFF_BASE_MS: u64 = 50;

/// Delay policy applied after a failed optimistic attempt.
///
/// Injected into the engine so tests can substitute [`NoDelay`] and assert
/// retry counts without wall-clock cost.
#[async_trait]
pub trait RetryDelay: Send + Sync {
    /// Wait before starting the attempt after failed attempt `attempt` (1-based).
    async fn wait(&self, attempt: u32);
}

/// Exponential backoff: 100ms after the first failed attempt, 200ms after the
/// second, doubling per attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExponentialBackoff;

impl ExponentialBackoff {
    /// The delay slept after failed attempt `attempt`.
    #[must_use]
    pub fn delay_for(attempt: u32) -> Duration {
        // Cap the shift; the attempt bound keeps us far from it in practice.
        Duration::from_millis(BACKOFF_BASE_MS.saturating_mul(1 << attempt.min(16)))
    }
}

#[async_trait]
impl RetryDelay for ExponentialBackoff {
    async fn wait(&self, attempt: u32) {
        tokio::time::sleep(Self::delay_for(attempt)).await;
    }
}

/// Zero-cost delay for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

#[async_trait]
impl RetryDelay for NoDelay {
    async fn wait(&self, _attempt: u32) {}
}
