//! Tests for the /payment endpoints.
//!
//! Note: create-order tests only cover validation errors that occur before
//! the gateway API call. Full checkout flow testing would require HTTP
//! mocking of the Razorpay orders API.

mod common;

use axum::{body::Body, http::Request};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;

fn json_request(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).expect("Response should be valid JSON")
}

fn setup_order(state: &AppState, gateway_order_id: &str, amount: i64) {
    let conn = state.db.get().unwrap();
    let user = create_test_user(&conn, "buyer@example.com");
    create_test_order(&conn, &user.id, gateway_order_id, amount);
}

// ============ POST /payment/create-order ============

#[tokio::test]
async fn test_create_order_rejects_invalid_phone() {
    let state = create_test_app_state();

    let response = app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payment/create-order")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(
                    "name=Asha&email=asha%40example.com&phone=12345",
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_order_rejects_invalid_email() {
    let state = create_test_app_state();

    let response = app(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/payment/create-order")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from("name=Asha&email=not-an-email&phone=9876543210"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
}

// ============ POST /payment/verify ============

#[tokio::test]
async fn test_verify_with_correct_signature_pays_order() {
    let state = create_test_app_state();
    setup_order(&state, "order_abc123", 123300);

    let body = json!({
        "razorpay_order_id": "order_abc123",
        "razorpay_payment_id": "pay_1",
        "razorpay_signature": payment_signature("order_abc123", "pay_1"),
    });

    let response = app(state.clone())
        .oneshot(json_request("/payment/verify", body))
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["order_id"], "order_abc123");
    // Email attempted once; no API key in tests so delivery fails
    assert_eq!(json["email_sent"], false);

    let conn = state.db.get().unwrap();
    let order = queries::get_order_by_gateway_id(&conn, "order_abc123")
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.amount, 123300);
    assert!(order.paid_at.is_some());
    assert_eq!(order.razorpay_payment_id.as_deref(), Some("pay_1"));
    assert_eq!(
        order.razorpay_signature.as_deref(),
        Some(payment_signature("order_abc123", "pay_1").as_str())
    );
}

#[tokio::test]
async fn test_verify_with_bad_signature_is_a_noop() {
    let state = create_test_app_state();
    setup_order(&state, "order_abc123", 123300);

    let body = json!({
        "razorpay_order_id": "order_abc123",
        "razorpay_payment_id": "pay_1",
        "razorpay_signature": "0000000000000000000000000000000000000000000000000000000000000000",
    });

    let response = app(state.clone())
        .oneshot(json_request("/payment/verify", body))
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Payment verification failed.");

    let conn = state.db.get().unwrap();
    let order = queries::get_order_by_gateway_id(&conn, "order_abc123")
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Created, "no transition on bad signature");
    assert!(order.paid_at.is_none());
}

#[tokio::test]
async fn test_repeated_verify_leaves_order_untouched() {
    let state = create_test_app_state();
    setup_order(&state, "order_abc123", 123300);

    let body = json!({
        "razorpay_order_id": "order_abc123",
        "razorpay_payment_id": "pay_1",
        "razorpay_signature": payment_signature("order_abc123", "pay_1"),
    });

    let first = app(state.clone())
        .oneshot(json_request("/payment/verify", body.clone()))
        .await
        .unwrap();
    assert_eq!(response_json(first).await["success"], true);

    let paid_at = {
        let conn = state.db.get().unwrap();
        queries::get_order_by_gateway_id(&conn, "order_abc123")
            .unwrap()
            .unwrap()
            .paid_at
    };

    let second = app(state.clone())
        .oneshot(json_request("/payment/verify", body))
        .await
        .unwrap();
    assert_eq!(second.status(), axum::http::StatusCode::OK);
    let json = response_json(second).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "Payment already confirmed.");

    let conn = state.db.get().unwrap();
    let order = queries::get_order_by_gateway_id(&conn, "order_abc123")
        .unwrap()
        .unwrap();
    assert_eq!(order.paid_at, paid_at, "paid_at unchanged on repeat verify");
    assert!(!order.email_sent, "email_sent unchanged on repeat verify");
}

#[tokio::test]
async fn test_verify_unknown_order_returns_not_found() {
    let state = create_test_app_state();

    let body = json!({
        "razorpay_order_id": "order_missing",
        "razorpay_payment_id": "pay_1",
        "razorpay_signature": payment_signature("order_missing", "pay_1"),
    });

    let response = app(state)
        .oneshot(json_request("/payment/verify", body))
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
}

// ============ POST /payment/resend-email ============

#[tokio::test]
async fn test_resend_email_requires_order_id() {
    let state = create_test_app_state();

    let response = app(state)
        .oneshot(json_request("/payment/resend-email", json!({})))
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::BAD_REQUEST);
    let json = response_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Order ID is required.");
}

#[tokio::test]
async fn test_resend_email_on_unpaid_order_fails() {
    let state = create_test_app_state();
    setup_order(&state, "order_abc123", 123300);

    let response = app(state)
        .oneshot(json_request(
            "/payment/resend-email",
            json!({ "order_id": "order_abc123" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Error: Order is not paid.");
}

#[tokio::test]
async fn test_resend_email_on_unknown_order_fails() {
    let state = create_test_app_state();

    let response = app(state)
        .oneshot(json_request(
            "/payment/resend-email",
            json!({ "order_id": "order_missing" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let json = response_json(response).await;
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Error: Order not found.");
}
