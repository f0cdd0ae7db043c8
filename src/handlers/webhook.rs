use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};

use crate::confirmation;
use crate::db::AppState;
use crate::error::Result;
use crate::payments::{RazorpayWebhookEvent, RazorpayWebhookPayload};

/// Axum handler for Razorpay webhooks.
///
/// Contract with the gateway: 200 for processed or ignored events (including
/// unknown orders - anything else triggers a retry storm), 401 for a bad
/// signature, 500 only when the body fails to parse.
pub async fn handle_razorpay_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    tracing::info!("Received Razorpay webhook");

    match headers.get("x-razorpay-signature") {
        Some(value) => {
            let Ok(signature) = value.to_str() else {
                tracing::debug!("Invalid UTF-8 in Razorpay signature header");
                return (StatusCode::BAD_REQUEST, "Invalid signature header");
            };

            match state.razorpay.verify_webhook_signature(&body, signature) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!("Invalid webhook signature");
                    return (StatusCode::UNAUTHORIZED, "Invalid signature");
                }
                Err(e) => {
                    tracing::error!("Signature verification error: {}", e);
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Signature verification failed",
                    );
                }
            }
        }
        None => {
            // Payloads without a signature header are processed unverified.
            tracing::warn!("Webhook has no signature header, processing unverified");
        }
    }

    let event: RazorpayWebhookEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("Failed to parse webhook body: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error processing webhook");
        }
    };

    tracing::info!(event = %event.event, "Processing webhook event");

    let result = match event.event.as_str() {
        "payment.captured" => handle_payment_captured(&state, &event.payload).await,
        "payment.failed" => handle_payment_failed(&state, &event.payload),
        "order.paid" => handle_order_paid(&state, &event.payload).await,
        _ => {
            tracing::info!(event = %event.event, "Unhandled webhook event");
            Ok(())
        }
    };

    match result {
        Ok(()) => (StatusCode::OK, "Webhook processed"),
        Err(e) => {
            // Acknowledged despite the failure: the gateway retries 5xx
            // responses, and a poisoned event must not retry forever.
            tracing::error!("Error processing webhook event: {}", e);
            (StatusCode::OK, "Webhook processed")
        }
    }
}

async fn handle_payment_captured(state: &AppState, payload: &RazorpayWebhookPayload) -> Result<()> {
    let Some(payment) = payload.payment.as_ref().map(|w| &w.entity) else {
        tracing::warn!("payment.captured event without payment entity, ignoring");
        return Ok(());
    };

    tracing::info!(
        order_id = %payment.order_id,
        payment_id = %payment.id,
        status = payment.status.as_deref().unwrap_or("-"),
        "Payment captured"
    );

    confirmation::confirm_paid(
        state,
        &payment.order_id,
        Some(&payment.id),
        None,
        "webhook payment.captured",
    )
    .await?;

    Ok(())
}

fn handle_payment_failed(state: &AppState, payload: &RazorpayWebhookPayload) -> Result<()> {
    let Some(payment) = payload.payment.as_ref().map(|w| &w.entity) else {
        tracing::warn!("payment.failed event without payment entity, ignoring");
        return Ok(());
    };

    tracing::warn!(
        order_id = %payment.order_id,
        payment_id = %payment.id,
        error_code = payment.error_code.as_deref().unwrap_or("-"),
        error_description = payment.error_description.as_deref().unwrap_or("-"),
        "Payment failed"
    );

    confirmation::mark_failed(state, &payment.order_id, Some(&payment.id))?;

    Ok(())
}

async fn handle_order_paid(state: &AppState, payload: &RazorpayWebhookPayload) -> Result<()> {
    let Some(order) = payload.order.as_ref().map(|w| &w.entity) else {
        tracing::warn!("order.paid event without order entity, ignoring");
        return Ok(());
    };

    tracing::info!(
        order_id = %order.id,
        status = order.status.as_deref().unwrap_or("-"),
        "Order paid event"
    );

    confirmation::confirm_paid(state, &order.id, None, None, "webhook order.paid").await?;

    Ok(())
}
