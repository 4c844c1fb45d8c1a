//! stockgate - concurrency-safe order placement over finite inventory.
//!
//! Resolves concurrent demand against a mutable stock counter in `PostgreSQL`
//! while preserving `stock >= 0` in every committed state and auditing every
//! terminal failure. Callers choose between two reservation protocols per
//! request:
//!
//! - **Pessimistic** (`POST /api/orders/pessimistic`): an exclusive row lock
//!   serializes writers; conflicting orders queue instead of racing.
//! - **Optimistic** (`POST /api/orders/optimistic`): lock-free reads with a
//!   version-guarded conditional decrement, retried with exponential backoff
//!   up to a fixed bound; exhausted retries become a classified
//!   `FAILED_CONFLICT` outcome rather than unbounded blocking.
//!
//! Successful orders are recorded inside the reservation transaction itself;
//! terminal failures are appended afterwards, outside the rolled-back
//! transaction, so every attempt stays queryable.
//!
//! The [`store::ReservationStore`] trait isolates the protocols from the
//! concrete store; [`store::PgStore`] is authoritative and an in-memory
//! substitute backs the test suite.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod server;
pub mod store;
pub mod types;

pub use config::Config;
pub use engine::OrderEngine;
pub use error::OrderError;
pub use server::{build_router, AppState};
pub use store::{PgStore, ReservationStore};
