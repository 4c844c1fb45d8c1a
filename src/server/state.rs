//! Application state for the HTTP server.

use crate::engine::OrderEngine;
use crate::store::ReservationStore;
use std::sync::Arc;

/// Shared resources for HTTP handlers, cloned cheaply per request.
///
/// Handlers that place orders go through the engine; read-only lookups and the
/// reset utility talk to the store directly since they perform no concurrency
/// control.
#[derive(Clone)]
pub struct AppState {
    /// Order-placement engine driving the reservation protocols
    pub engine: Arc<OrderEngine>,
    /// Underlying store, for lookups, stats and reset
    pub store: Arc<dyn ReservationStore>,
}

impl AppState {
    /// Create application state over a store, with the production backoff.
    #[must_use]
    pub fn new(store: Arc<dyn ReservationStore>) -> Self {
        Self {
            engine: Arc::new(OrderEngine::new(store.clone())),
            store,
        }
    }
}
