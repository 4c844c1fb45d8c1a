//! In-memory substitute store for tests.
//!
//! Emulates the two store behaviors the protocols rely on: per-product
//! exclusive row locks for the pessimistic path, and snapshot-then-CAS with a
//! scheduling point in between for the optimistic path, so concurrent test
//! tasks can genuinely interleave and conflict. Mutations are applied under a
//! single state lock, so a failed attempt leaves no partial writes, matching
//! transactional rollback.

use crate::error::OrderError;
use crate::store::ReservationStore;
use crate::types::{
    Order, OrderId, OrderRequest, OrderStats, OrderStatus, PlacedOrder, Product, ProductId,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct State {
    products: HashMap<i64, Product>,
    orders: Vec<Order>,
    next_order_id: i64,
}

impl State {
    fn insert_order(&mut self, request: &OrderRequest, status: OrderStatus) -> OrderId {
        self.next_order_id += 1;
        let id = OrderId(self.next_order_id);
        self.orders.push(Order {
            id,
            product_id: request.product_id,
            quantity_ordered: request.quantity,
            user_id: request.user_id.clone(),
            status,
            created_at: Utc::now(),
        });
        id
    }
}

/// In-memory reservation store seeded with the same baseline as the database
/// migrations: product 1 with stock 100 and product 2 with stock 50.
pub struct InMemoryStore {
    state: Mutex<State>,
    row_locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create a store with the seeded baseline inventory.
    #[must_use]
    pub fn new() -> Self {
        let mut state = State::default();
        seed(&mut state);
        Self {
            state: Mutex::new(state),
            row_locks: Mutex::default(),
        }
    }

    async fn row_lock(&self, id: ProductId) -> Arc<Mutex<()>> {
        let mut locks = self.row_locks.lock().await;
        locks.entry(id.0).or_default().clone()
    }
}

fn seed(state: &mut State) {
    for (id, stock) in [(1, 100), (2, 50)] {
        state.products.insert(
            id,
            Product {
                id: ProductId(id),
                stock,
                version: 1,
            },
        );
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn reserve_locked(&self, request: &OrderRequest) -> Result<PlacedOrder, OrderError> {
        // Exclusive per-row lock held across the read-check-write window.
        let lock = self.row_lock(request.product_id).await;
        let _guard = lock.lock().await;

        let mut state = self.state.lock().await;
        let stock = state
            .products
            .get(&request.product_id.0)
            .map(|p| p.stock)
            .ok_or(OrderError::NotFound(request.product_id))?;
        if stock < request.quantity {
            return Err(OrderError::InsufficientStock {
                product_id: request.product_id,
                requested: request.quantity,
                available: stock,
            });
        }

        let stock_remaining = {
            // Checked above; entry is present.
            let product = state
                .products
                .get_mut(&request.product_id.0)
                .ok_or(OrderError::NotFound(request.product_id))?;
            product.stock -= request.quantity;
            product.stock
        };
        let order_id = state.insert_order(request, OrderStatus::Success);

        Ok(PlacedOrder {
            order_id,
            product_id: request.product_id,
            quantity_ordered: request.quantity,
            stock_remaining,
            new_version: None,
        })
    }

    async fn reserve_versioned(&self, request: &OrderRequest) -> Result<PlacedOrder, OrderError> {
        // Unlocked snapshot read.
        let (stock, version) = {
            let state = self.state.lock().await;
            let product = state
                .products
                .get(&request.product_id.0)
                .ok_or(OrderError::NotFound(request.product_id))?;
            (product.stock, product.version)
        };
        if stock < request.quantity {
            return Err(OrderError::InsufficientStock {
                product_id: request.product_id,
                requested: request.quantity,
                available: stock,
            });
        }

        // Scheduling point between read and write so concurrent attempts can
        // interleave and lose the version race, as against a real store.
        tokio::task::yield_now().await;

        let mut state = self.state.lock().await;
        let (stock_remaining, new_version) = {
            let product = state
                .products
                .get_mut(&request.product_id.0)
                .ok_or(OrderError::NotFound(request.product_id))?;
            if product.version != version {
                return Err(OrderError::Conflict(request.product_id));
            }
            product.stock -= request.quantity;
            product.version += 1;
            (product.stock, product.version)
        };
        let order_id = state.insert_order(request, OrderStatus::Success);

        Ok(PlacedOrder {
            order_id,
            product_id: request.product_id,
            quantity_ordered: request.quantity,
            stock_remaining,
            new_version: Some(new_version),
        })
    }

    async fn record_failure(
        &self,
        request: &OrderRequest,
        status: OrderStatus,
    ) -> Result<OrderId, OrderError> {
        let mut state = self.state.lock().await;
        Ok(state.insert_order(request, status))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, OrderError> {
        let state = self.state.lock().await;
        Ok(state.products.get(&id.0).cloned())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, OrderError> {
        let state = self.state.lock().await;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn order_stats(&self) -> Result<OrderStats, OrderError> {
        let state = self.state.lock().await;
        let mut stats = OrderStats {
            total_orders: state.orders.len() as i64,
            ..OrderStats::default()
        };
        for order in &state.orders {
            match order.status {
                OrderStatus::Success => stats.successful_orders += 1,
                OrderStatus::FailedOutOfStock => stats.failed_out_of_stock += 1,
                OrderStatus::FailedConflict => stats.failed_conflict += 1,
            }
        }
        Ok(stats)
    }

    async fn reset_inventory(&self) -> Result<(), OrderError> {
        let mut state = self.state.lock().await;
        state.products.clear();
        seed(&mut state);
        state.orders.clear();
        Ok(())
    }

    async fn ping(&self) -> bool {
        true
    }
}
