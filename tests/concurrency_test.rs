//! Concurrency properties of the reservation protocols.
//!
//! Runs genuinely concurrent placements against the in-memory substitute
//! store, which reproduces the store behaviors the protocols depend on:
//! exclusive per-row locks and version compare-and-swap.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use stockgate::engine::{NoDelay, OrderEngine};
use stockgate::store::{InMemoryStore, ReservationStore};
use stockgate::types::{OrderId, OrderRequest, ProductId};
use stockgate::OrderError;

fn request(product_id: i64, quantity: i32, user: &str) -> OrderRequest {
    OrderRequest {
        product_id: ProductId(product_id),
        quantity,
        user_id: user.to_string(),
    }
}

fn engine_over(store: &Arc<InMemoryStore>) -> Arc<OrderEngine> {
    Arc::new(OrderEngine::with_delay(store.clone(), Arc::new(NoDelay)))
}

/// Two concurrent pessimistic orders of 30 against stock 50: exactly one
/// succeeds (stock 20), the other is rejected on the stock check and audited.
#[tokio::test]
async fn pessimistic_mutual_exclusion_on_last_stock() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(&store);

    // Product 2 is seeded with stock 50.
    let a = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.place_pessimistic(&request(2, 30, "alice")).await })
    };
    let b = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.place_pessimistic(&request(2, 30, "bob")).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejections = results
        .iter()
        .filter(|r| matches!(r, Err(OrderError::InsufficientStock { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(rejections, 1);

    let product = store.get_product(ProductId(2)).await.unwrap().unwrap();
    assert_eq!(product.stock, 20);

    let stats = store.order_stats().await.unwrap();
    assert_eq!(stats.total_orders, 2);
    assert_eq!(stats.successful_orders, 1);
    assert_eq!(stats.failed_out_of_stock, 1);
    assert_eq!(stats.failed_conflict, 0);
}

/// Stock never goes negative and final stock equals the initial value minus
/// the sum of successful quantities, under heavy pessimistic contention.
#[tokio::test]
async fn pessimistic_conservation_under_contention() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(&store);

    // 30 concurrent orders of 7 against stock 100: at most 14 can succeed.
    let mut handles = Vec::new();
    for i in 0..30 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .place_pessimistic(&request(1, 7, &format!("user-{i}")))
                .await
        }));
    }

    let mut successes = 0_i64;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    let product = store.get_product(ProductId(1)).await.unwrap().unwrap();
    assert!(product.stock >= 0, "stock must never go negative");
    assert_eq!(i64::from(product.stock), 100 - 7 * successes);

    let stats = store.order_stats().await.unwrap();
    assert_eq!(stats.successful_orders, successes);
    assert_eq!(stats.total_orders, 30, "every attempt leaves exactly one row");
}

/// Conservation and version monotonicity under concurrent optimistic writers:
/// the version advances by exactly one per successful decrement.
#[tokio::test]
async fn optimistic_conservation_and_version_monotonicity() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(&store);

    let mut handles = Vec::new();
    for i in 0..20 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .place_optimistic(&request(1, 5, &format!("user-{i}")))
                .await
        }));
    }

    let mut successes = 0_i64;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            successes += 1;
        }
    }

    let product = store.get_product(ProductId(1)).await.unwrap().unwrap();
    assert!(product.stock >= 0);
    assert_eq!(i64::from(product.stock), 100 - 5 * successes);
    assert_eq!(i64::from(product.version), 1 + successes);

    let stats = store.order_stats().await.unwrap();
    assert_eq!(stats.successful_orders, successes);
    // Every request terminates with exactly one recorded outcome.
    assert_eq!(stats.total_orders, 20);
}

/// The scenario from the drawing board: stock 100, three concurrent optimistic
/// orders of 40. Two must succeed (stock 20, version 3); the third is rejected
/// on the stock check, never on conflict exhaustion, because at most two
/// commits exist to lose races against.
#[tokio::test]
async fn optimistic_three_way_race_rejects_loser_on_stock() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(&store);

    let mut handles = Vec::new();
    for user in ["alice", "bob", "carol"] {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.place_optimistic(&request(1, 40, user)).await
        }));
    }

    let mut successes = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(OrderError::InsufficientStock { .. }) => out_of_stock += 1,
            Err(other) => panic!("unexpected outcome: {other}"),
        }
    }
    assert_eq!(successes, 2);
    assert_eq!(out_of_stock, 1);

    let product = store.get_product(ProductId(1)).await.unwrap().unwrap();
    assert_eq!(product.stock, 20);
    assert_eq!(product.version, 3);

    let stats = store.order_stats().await.unwrap();
    assert_eq!(stats.successful_orders, 2);
    assert_eq!(stats.failed_out_of_stock, 1);
    assert_eq!(stats.failed_conflict, 0, "no conflict exhaustion possible here");
}

/// A rolled-back reservation leaves no trace on the product, yet the failure
/// is still queryable as exactly one order row.
#[tokio::test]
async fn audit_row_survives_rolled_back_reservation() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(&store);

    let before = store.get_product(ProductId(2)).await.unwrap().unwrap();
    let result = engine.place_optimistic(&request(2, 500, "greedy")).await;
    assert!(matches!(result, Err(OrderError::InsufficientStock { .. })));

    let after = store.get_product(ProductId(2)).await.unwrap().unwrap();
    assert_eq!(after.stock, before.stock, "rollback leaves stock untouched");
    assert_eq!(after.version, before.version);

    let stats = store.order_stats().await.unwrap();
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.failed_out_of_stock, 1);

    let order = store
        .get_order(OrderId(1))
        .await
        .unwrap()
        .expect("audit row must be queryable");
    assert_eq!(order.quantity_ordered, 500);
    assert_eq!(order.user_id, "greedy");
}

/// Successive successful optimistic orders observe strictly increasing
/// versions with no gaps.
#[tokio::test]
async fn optimistic_versions_increase_by_one_per_commit() {
    let store = Arc::new(InMemoryStore::new());
    let engine = engine_over(&store);

    for expected_version in 2..=5 {
        let placed = engine
            .place_optimistic(&request(1, 10, "serial"))
            .await
            .expect("uncontended order should succeed");
        assert_eq!(placed.new_version, Some(expected_version));
    }

    let product = store.get_product(ProductId(1)).await.unwrap().unwrap();
    assert_eq!(product.stock, 60);
    assert_eq!(product.version, 5);
}
