use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::confirmation::{self, PaidOutcome, ResendError};
use crate::db::{queries, AppState};
use crate::error::{AppError, Result};
use crate::extractors::{Form, Json};
use crate::models::{CreateOrder, CreateUser};

/// Checkout view-model returned to the payment page.
#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_id: String,
    /// Amount in paise
    pub amount: i64,
    /// Public key id for the client-side checkout widget
    pub razorpay_key: String,
    pub name: String,
    pub email: String,
}

/// Registration + order creation in one step.
///
/// The buyer is deduplicated by email (repeat buyers keep their original
/// row), a gateway order is opened for the configured product price, and an
/// order row is persisted in `created` state.
pub async fn create_order(
    State(state): State<AppState>,
    Form(input): Form<CreateUser>,
) -> Result<Json<CheckoutResponse>> {
    input.validate()?;

    let user = {
        let conn = state.db.get()?;
        match queries::get_user_by_email(&conn, &input.email)? {
            Some(user) => user,
            None => queries::create_user(&conn, &input)?,
        }
    };

    // Price is configured in rupees; the gateway wants paise.
    let amount = state.product_price * 100;
    let receipt = format!("order_{}", chrono::Utc::now().timestamp_millis());
    let gateway_order = state.razorpay.create_order(amount, &receipt).await?;

    let conn = state.db.get()?;
    let order = queries::create_order(
        &conn,
        &CreateOrder {
            user_id: user.id.clone(),
            razorpay_order_id: gateway_order.id,
            amount,
        },
    )?;

    tracing::info!(
        order_id = %order.razorpay_order_id,
        user_id = %user.id,
        amount,
        "Checkout order created"
    );

    Ok(Json(CheckoutResponse {
        order_id: order.razorpay_order_id,
        amount: order.amount,
        razorpay_key: state.razorpay.key_id().to_string(),
        name: user.name,
        email: user.email,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_sent: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub message: String,
}

/// Client-side confirmation after the checkout widget reports success.
///
/// The signature guard runs before any state is touched; an invalid
/// signature is a no-op rejection. A valid one funnels into the same
/// idempotent confirmation the webhook path uses.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>> {
    let valid = state.razorpay.verify_payment_signature(
        &request.razorpay_order_id,
        &request.razorpay_payment_id,
        &request.razorpay_signature,
    )?;

    if !valid {
        tracing::warn!(
            order_id = %request.razorpay_order_id,
            "Payment verification rejected: invalid signature"
        );
        return Ok(Json(VerifyResponse {
            success: false,
            email_sent: None,
            order_id: None,
            message: "Payment verification failed.".to_string(),
        }));
    }

    let outcome = confirmation::confirm_paid(
        &state,
        &request.razorpay_order_id,
        Some(&request.razorpay_payment_id),
        Some(&request.razorpay_signature),
        "verify",
    )
    .await?;

    match outcome {
        PaidOutcome::Confirmed { email_sent } => Ok(Json(VerifyResponse {
            success: true,
            email_sent: Some(email_sent),
            order_id: Some(request.razorpay_order_id.clone()),
            message: if email_sent {
                "Payment successful! Check your email for the PDF.".to_string()
            } else {
                "Payment successful! Email delivery failed - use the resend button.".to_string()
            },
        })),
        PaidOutcome::AlreadyPaid { email_sent } => Ok(Json(VerifyResponse {
            success: true,
            email_sent: Some(email_sent),
            order_id: Some(request.razorpay_order_id.clone()),
            message: "Payment already confirmed.".to_string(),
        })),
        PaidOutcome::NotFound => Err(AppError::NotFound("Order not found".into())),
    }
}

#[derive(Debug, Deserialize)]
pub struct ResendEmailRequest {
    #[serde(default)]
    pub order_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResendEmailResponse {
    pub success: bool,
    pub message: String,
}

/// Re-send the fulfillment email for a paid order.
///
/// Failures stay inside the response body: the buyer-facing page renders
/// `message` whether or not the resend worked.
pub async fn resend_email(
    State(state): State<AppState>,
    Json(request): Json<ResendEmailRequest>,
) -> Result<(StatusCode, Json<ResendEmailResponse>)> {
    let Some(order_id) = request.order_id.as_deref().filter(|id| !id.is_empty()) else {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(ResendEmailResponse {
                success: false,
                message: "Order ID is required.".to_string(),
            }),
        ));
    };

    let response = match confirmation::resend_email(&state, order_id).await {
        Ok(email_sent) => ResendEmailResponse {
            success: email_sent,
            message: if email_sent {
                "Email sent successfully! Please check your inbox.".to_string()
            } else {
                "Failed to send email. Please try again or contact support.".to_string()
            },
        },
        Err(e @ (ResendError::OrderNotFound | ResendError::OrderNotPaid)) => {
            tracing::warn!(order_id, error = %e, "Resend email rejected");
            ResendEmailResponse {
                success: false,
                message: format!("Error: {}.", e),
            }
        }
        Err(ResendError::App(e)) => return Err(e),
    };

    Ok((StatusCode::OK, Json(response)))
}
