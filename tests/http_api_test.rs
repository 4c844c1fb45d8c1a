//! HTTP API tests over the in-memory substitute store.
//!
//! Exercises the full router: request validation, status-code mapping of the
//! classified failures, and the JSON shapes clients depend on.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use stockgate::store::InMemoryStore;
use stockgate::{build_router, AppState, ReservationStore};

fn test_server() -> TestServer {
    let store: Arc<dyn ReservationStore> = Arc::new(InMemoryStore::new());
    let app = build_router(AppState::new(store));
    TestServer::new(app).expect("router should build")
}

#[tokio::test]
async fn health_endpoints_respond() {
    let server = test_server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");

    let response = server.get("/ready").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["ready"], true);
}

#[tokio::test]
async fn get_product_returns_seeded_inventory() {
    let server = test_server();

    let response = server.get("/api/products/1").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["id"], 1);
    assert_eq!(body["stock"], 100);
    assert_eq!(body["version"], 1);

    server.get("/api/products/999").await.assert_status_not_found();
}

#[tokio::test]
async fn pessimistic_order_decrements_stock_and_records_success() {
    let server = test_server();

    let response = server
        .post("/api/orders/pessimistic")
        .json(&json!({"productId": 1, "quantity": 5, "userId": "alice"}))
        .await;
    assert_eq!(response.status_code(), 201);
    let body = response.json::<Value>();
    assert_eq!(body["orderId"], 1);
    assert_eq!(body["productId"], 1);
    assert_eq!(body["quantityOrdered"], 5);
    assert_eq!(body["stockRemaining"], 95);
    assert!(body.get("newVersion").is_none(), "pessimistic result carries no version");

    let order = server.get("/api/orders/1").await;
    order.assert_status_ok();
    let order = order.json::<Value>();
    assert_eq!(order["status"], "SUCCESS");
    assert_eq!(order["userId"], "alice");
}

#[tokio::test]
async fn optimistic_order_reports_new_version() {
    let server = test_server();

    let response = server
        .post("/api/orders/optimistic")
        .json(&json!({"productId": 2, "quantity": 10, "userId": "bob"}))
        .await;
    assert_eq!(response.status_code(), 201);
    let body = response.json::<Value>();
    assert_eq!(body["stockRemaining"], 40);
    assert_eq!(body["newVersion"], 2);
}

#[tokio::test]
async fn insufficient_stock_is_a_400_with_an_audit_row() {
    let server = test_server();

    let response = server
        .post("/api/orders/pessimistic")
        .json(&json!({"productId": 2, "quantity": 500, "userId": "greedy"}))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "BAD_REQUEST");

    // Stock untouched, failure still recorded.
    let product = server.get("/api/products/2").await.json::<Value>();
    assert_eq!(product["stock"], 50);

    let stats = server.get("/api/orders/stats").await.json::<Value>();
    assert_eq!(stats["totalOrders"], 1);
    assert_eq!(stats["successfulOrders"], 0);
    assert_eq!(stats["failedOutOfStock"], 1);
    assert_eq!(stats["failedConflict"], 0);
}

#[tokio::test]
async fn unknown_product_is_a_404_without_audit() {
    let server = test_server();

    let response = server
        .post("/api/orders/optimistic")
        .json(&json!({"productId": 42, "quantity": 1, "userId": "alice"}))
        .await;
    response.assert_status_not_found();

    let stats = server.get("/api/orders/stats").await.json::<Value>();
    assert_eq!(stats["totalOrders"], 0, "no audit row without a prior reservation");
}

#[tokio::test]
async fn zero_quantity_is_rejected_before_any_protocol_runs() {
    let server = test_server();

    let response = server
        .post("/api/orders/pessimistic")
        .json(&json!({"productId": 1, "quantity": 0, "userId": "alice"}))
        .await;
    assert_eq!(response.status_code(), 400);

    let stats = server.get("/api/orders/stats").await.json::<Value>();
    assert_eq!(stats["totalOrders"], 0);
}

#[tokio::test]
async fn missing_order_is_a_404() {
    let server = test_server();
    server.get("/api/orders/12345").await.assert_status_not_found();
}

#[tokio::test]
async fn reset_restores_baseline_and_clears_orders() {
    let server = test_server();

    server
        .post("/api/orders/pessimistic")
        .json(&json!({"productId": 1, "quantity": 30, "userId": "alice"}))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server.post("/api/products/reset").await;
    response.assert_status_ok();

    let product = server.get("/api/products/1").await.json::<Value>();
    assert_eq!(product["stock"], 100);
    assert_eq!(product["version"], 1);

    let stats = server.get("/api/orders/stats").await.json::<Value>();
    assert_eq!(stats["totalOrders"], 0);
}
