//! `PostgreSQL` implementation of the reservation store.
//!
//! This module owns all transaction control: [`PgStore::with_transaction`] is
//! the single place BEGIN/COMMIT/ROLLBACK happen, and both reservation
//! protocols run as closures inside it. The audit insert deliberately bypasses
//! it so failure rows survive the rollback of the reservation they describe.

use crate::config::PostgresConfig;
use crate::error::OrderError;
use crate::store::ReservationStore;
use crate::types::{
    Order, OrderId, OrderRequest, OrderStats, OrderStatus, PlacedOrder, Product, ProductId,
};
use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool, Row};
use std::time::Duration;

/// Default bound on pessimistic lock acquisition. A writer queued behind a
/// slow lock holder fails with a storage error instead of waiting forever.
const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// `PostgreSQL`-backed reservation store.
///
/// Holds a shared connection pool; every transaction borrows exactly one
/// connection for its duration and returns it unconditionally.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    lock_timeout_ms: u64,
}

impl PgStore {
    /// Wrap an existing connection pool with the default lock timeout.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    /// Connect a pool per the configuration and run pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the pool cannot be established or a
    /// migration fails.
    pub async fn connect(config: &PostgresConfig) -> Result<Self, OrderError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .idle_timeout(Duration::from_secs(config.idle_timeout))
            .connect(&config.url)
            .await
            .map_err(|e| OrderError::storage("failed to connect to database", e))?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| OrderError::Storage(format!("failed to run migrations: {e}")))?;

        Ok(Self {
            pool,
            lock_timeout_ms: config.lock_timeout_ms,
        })
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run `op` inside one transaction: commit on `Ok`, roll back on `Err`,
    /// and re-raise the operation's error unchanged.
    ///
    /// The borrowed connection returns to the pool in every case. A rollback
    /// failure is logged but never replaces the error that caused it.
    async fn with_transaction<T, F>(&self, op: F) -> Result<T, OrderError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut PgConnection) -> BoxFuture<'t, Result<T, OrderError>> + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| OrderError::storage("failed to begin transaction", e))?;

        match op(&mut tx).await {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| OrderError::storage("failed to commit transaction", e))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(error = %rollback_err, "transaction rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Insert a `SUCCESS` order row on the transaction connection.
async fn insert_success_order(
    conn: &mut PgConnection,
    product_id: ProductId,
    quantity: i32,
    user_id: &str,
) -> Result<OrderId, OrderError> {
    let (order_id,): (i64,) = sqlx::query_as(
        r"
        INSERT INTO orders (product_id, quantity_ordered, user_id, status)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        ",
    )
    .bind(product_id.0)
    .bind(quantity)
    .bind(user_id)
    .bind(OrderStatus::Success.as_str())
    .fetch_one(conn)
    .await
    .map_err(|e| OrderError::storage("failed to insert order", e))?;

    Ok(OrderId(order_id))
}

#[async_trait]
impl ReservationStore for PgStore {
    async fn reserve_locked(&self, request: &OrderRequest) -> Result<PlacedOrder, OrderError> {
        let product_id = request.product_id;
        let quantity = request.quantity;
        let user_id = request.user_id.clone();
        let lock_timeout = format!("SET LOCAL lock_timeout = '{}ms'", self.lock_timeout_ms);

        self.with_transaction(move |conn| {
            Box::pin(async move {
                // lock_timeout cannot be bound as a parameter
                sqlx::query(&lock_timeout)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| OrderError::storage("failed to set lock timeout", e))?;

                // Blocks until any other transaction holding this row finishes.
                let row: Option<(i32,)> =
                    sqlx::query_as("SELECT stock FROM products WHERE id = $1 FOR UPDATE")
                        .bind(product_id.0)
                        .fetch_optional(&mut *conn)
                        .await
                        .map_err(|e| OrderError::storage("failed to lock product row", e))?;

                let (stock,) = row.ok_or(OrderError::NotFound(product_id))?;
                if stock < quantity {
                    return Err(OrderError::InsufficientStock {
                        product_id,
                        requested: quantity,
                        available: stock,
                    });
                }

                // Race-free: the exclusive lock covers this read-then-write.
                let (stock_remaining,): (i32,) = sqlx::query_as(
                    "UPDATE products SET stock = stock - $1 WHERE id = $2 RETURNING stock",
                )
                .bind(quantity)
                .bind(product_id.0)
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| OrderError::storage("failed to decrement stock", e))?;

                let order_id =
                    insert_success_order(&mut *conn, product_id, quantity, &user_id).await?;

                Ok(PlacedOrder {
                    order_id,
                    product_id,
                    quantity_ordered: quantity,
                    stock_remaining,
                    new_version: None,
                })
            })
        })
        .await
    }

    async fn reserve_versioned(&self, request: &OrderRequest) -> Result<PlacedOrder, OrderError> {
        let product_id = request.product_id;
        let quantity = request.quantity;
        let user_id = request.user_id.clone();

        self.with_transaction(move |conn| {
            Box::pin(async move {
                let row: Option<(i32, i32)> =
                    sqlx::query_as("SELECT stock, version FROM products WHERE id = $1")
                        .bind(product_id.0)
                        .fetch_optional(&mut *conn)
                        .await
                        .map_err(|e| OrderError::storage("failed to read product", e))?;

                let (stock, version) = row.ok_or(OrderError::NotFound(product_id))?;
                if stock < quantity {
                    return Err(OrderError::InsufficientStock {
                        product_id,
                        requested: quantity,
                        available: stock,
                    });
                }

                // Compare-and-swap: only commits against the version we read.
                let updated: Option<(i32, i32)> = sqlx::query_as(
                    r"
                    UPDATE products
                    SET stock = stock - $1, version = version + 1
                    WHERE id = $2 AND version = $3
                    RETURNING stock, version
                    ",
                )
                .bind(quantity)
                .bind(product_id.0)
                .bind(version)
                .fetch_optional(&mut *conn)
                .await
                .map_err(|e| OrderError::storage("failed to apply conditional update", e))?;

                let Some((stock_remaining, new_version)) = updated else {
                    // Another writer committed first; the whole attempt is retried.
                    return Err(OrderError::Conflict(product_id));
                };

                let order_id =
                    insert_success_order(&mut *conn, product_id, quantity, &user_id).await?;

                Ok(PlacedOrder {
                    order_id,
                    product_id,
                    quantity_ordered: quantity,
                    stock_remaining,
                    new_version: Some(new_version),
                })
            })
        })
        .await
    }

    async fn record_failure(
        &self,
        request: &OrderRequest,
        status: OrderStatus,
    ) -> Result<OrderId, OrderError> {
        // Single statement on the pool, outside any transaction, so the row
        // survives the rollback of the reservation it describes.
        let (order_id,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO orders (product_id, quantity_ordered, user_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(request.product_id.0)
        .bind(request.quantity)
        .bind(&request.user_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| OrderError::storage("failed to record order failure", e))?;

        Ok(OrderId(order_id))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, OrderError> {
        let row: Option<(i64, i32, i32)> =
            sqlx::query_as("SELECT id, stock, version FROM products WHERE id = $1")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| OrderError::storage("failed to query product", e))?;

        Ok(row.map(|(id, stock, version)| Product {
            id: ProductId(id),
            stock,
            version,
        }))
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, OrderError> {
        let row = sqlx::query(
            r"
            SELECT id, product_id, quantity_ordered, user_id, status, created_at
            FROM orders
            WHERE id = $1
            ",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| OrderError::storage("failed to query order", e))?;

        row.map(|row| {
            let status_str: String = row.get("status");
            Ok(Order {
                id: OrderId(row.get("id")),
                product_id: ProductId(row.get("product_id")),
                quantity_ordered: row.get("quantity_ordered"),
                user_id: row.get("user_id"),
                status: OrderStatus::parse(&status_str)?,
                created_at: row.get("created_at"),
            })
        })
        .transpose()
    }

    async fn order_stats(&self) -> Result<OrderStats, OrderError> {
        let (total, successful, out_of_stock, conflict): (i64, i64, i64, i64) = sqlx::query_as(
            r"
            SELECT
                COUNT(*),
                COUNT(*) FILTER (WHERE status = 'SUCCESS'),
                COUNT(*) FILTER (WHERE status = 'FAILED_OUT_OF_STOCK'),
                COUNT(*) FILTER (WHERE status = 'FAILED_CONFLICT')
            FROM orders
            ",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| OrderError::storage("failed to query order stats", e))?;

        Ok(OrderStats {
            total_orders: total,
            successful_orders: successful,
            failed_out_of_stock: out_of_stock,
            failed_conflict: conflict,
        })
    }

    async fn reset_inventory(&self) -> Result<(), OrderError> {
        self.with_transaction(|conn| {
            Box::pin(async move {
                sqlx::query("UPDATE products SET stock = 100, version = 1 WHERE id = 1")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| OrderError::storage("failed to reset product 1", e))?;
                sqlx::query("UPDATE products SET stock = 50, version = 1 WHERE id = 2")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| OrderError::storage("failed to reset product 2", e))?;
                sqlx::query("DELETE FROM orders")
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| OrderError::storage("failed to clear orders", e))?;
                Ok(())
            })
        })
        .await?;

        tracing::info!("inventory reset to baseline");
        Ok(())
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
