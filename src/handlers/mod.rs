pub mod payment;
pub mod webhook;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/payment/create-order", post(payment::create_order))
        .route("/payment/verify", post(payment::verify_payment))
        .route("/payment/resend-email", post(payment::resend_email))
        .route("/webhook/razorpay", post(webhook::handle_razorpay_webhook))
}
