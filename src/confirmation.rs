//! Order confirmation state machine.
//!
//! Two inbound triggers race for the same order: the client's synchronous
//! verification call and the gateway's asynchronous webhook. Both funnel
//! through [`confirm_paid`], where a conditional UPDATE on the status column
//! decides the winner; the loser observes an already-paid order and no-ops,
//! which is what keeps fulfillment email dispatch at-most-once.

use thiserror::Error;

use crate::db::{queries, AppState};
use crate::email::EmailSendResult;
use crate::error::{AppError, Result};
use crate::models::{OrderStatus, User};

/// Outcome of a paid-confirmation trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaidOutcome {
    /// This trigger won the claim; the fulfillment email was attempted once.
    Confirmed { email_sent: bool },
    /// The order was already paid - no mutation, no email.
    AlreadyPaid { email_sent: bool },
    /// No order exists for the gateway order id.
    NotFound,
}

/// Outcome of a payment-failed trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedOutcome {
    /// The order transitioned to `failed`.
    Marked,
    /// The order had already left `created` state - no mutation.
    Ignored,
    /// No order exists for the gateway order id.
    NotFound,
}

/// Errors from the resend-email operation, distinguishing a missing order
/// from an order in the wrong state.
#[derive(Debug, Error)]
pub enum ResendError {
    #[error("Order not found")]
    OrderNotFound,
    #[error("Order is not paid")]
    OrderNotPaid,
    #[error(transparent)]
    App(#[from] AppError),
}

/// Confirm an order as paid and fulfill it.
///
/// The status CAS is the idempotency gate: on a lost claim nothing is
/// mutated and no email goes out. On a won claim the payment id, signature
/// and paid_at are recorded, the fulfillment email is attempted exactly
/// once, and its outcome lands in `email_sent` - a delivery failure never
/// aborts the transition.
///
/// `trigger` names the inbound path for the logs ("verify", "webhook ...").
pub async fn confirm_paid(
    state: &AppState,
    gateway_order_id: &str,
    payment_id: Option<&str>,
    signature: Option<&str>,
    trigger: &'static str,
) -> Result<PaidOutcome> {
    let user = {
        let conn = state.db.get()?;

        let Some(order) = queries::get_order_by_gateway_id(&conn, gateway_order_id)? else {
            tracing::warn!(
                gateway_order_id,
                trigger,
                "Order not found for paid confirmation"
            );
            return Ok(PaidOutcome::NotFound);
        };

        if !queries::try_mark_order_paid(&conn, gateway_order_id, payment_id, signature)? {
            tracing::info!(gateway_order_id, trigger, "Order already marked as paid");
            return Ok(PaidOutcome::AlreadyPaid {
                email_sent: order.email_sent,
            });
        }

        queries::get_user_by_id(&conn, &order.user_id)?
    };

    // Claim won: dispatch fulfillment outside the connection borrow.
    let email_result = match user {
        Some(ref user) => state.email.send_fulfillment_email(user).await,
        None => {
            tracing::error!(
                gateway_order_id,
                "Paid order has no user row, skipping fulfillment email"
            );
            EmailSendResult::Failed
        }
    };

    let email_sent = email_result.delivered();
    record_email_outcome(state, gateway_order_id, user.as_ref(), email_result)?;

    tracing::info!(
        gateway_order_id,
        payment_id = payment_id.unwrap_or("-"),
        email_sent,
        "Order marked as paid via {}",
        trigger
    );

    Ok(PaidOutcome::Confirmed { email_sent })
}

/// Mark an order as failed. Only `created` orders transition; a late failure
/// event never overwrites a confirmation that already won.
pub fn mark_failed(
    state: &AppState,
    gateway_order_id: &str,
    payment_id: Option<&str>,
) -> Result<FailedOutcome> {
    let conn = state.db.get()?;

    if queries::get_order_by_gateway_id(&conn, gateway_order_id)?.is_none() {
        tracing::warn!(gateway_order_id, "Order not found for failed payment");
        return Ok(FailedOutcome::NotFound);
    }

    if queries::try_mark_order_failed(&conn, gateway_order_id, payment_id)? {
        tracing::info!(gateway_order_id, "Order marked as failed");
        Ok(FailedOutcome::Marked)
    } else {
        tracing::info!(
            gateway_order_id,
            "Order already left created state, failure event ignored"
        );
        Ok(FailedOutcome::Ignored)
    }
}

/// Re-send the fulfillment email for an already-paid order.
///
/// Returns whether the provider accepted the message; the result is
/// re-recorded in `email_sent` either way.
pub async fn resend_email(
    state: &AppState,
    gateway_order_id: &str,
) -> std::result::Result<bool, ResendError> {
    let user = {
        let conn = state.db.get().map_err(AppError::from)?;

        let order = queries::get_order_by_gateway_id(&conn, gateway_order_id)?
            .ok_or(ResendError::OrderNotFound)?;

        if order.status != OrderStatus::Paid {
            return Err(ResendError::OrderNotPaid);
        }

        queries::get_user_by_id(&conn, &order.user_id)?
            .ok_or_else(|| AppError::Internal(format!("No user for order {}", order.id)))?
    };

    let email_result = state.email.send_fulfillment_email(&user).await;
    let email_sent = email_result.delivered();
    record_email_outcome(state, gateway_order_id, Some(&user), email_result)?;

    tracing::info!(gateway_order_id, email_sent, "Fulfillment email resent");

    Ok(email_sent)
}

/// Record an email attempt on the order, and on the user when the PDF
/// actually went out.
fn record_email_outcome(
    state: &AppState,
    gateway_order_id: &str,
    user: Option<&User>,
    result: EmailSendResult,
) -> Result<()> {
    let conn = state.db.get()?;
    queries::set_order_email_sent(&conn, gateway_order_id, result.delivered())?;

    if let (Some(user), EmailSendResult::Sent { pdf_attached: true }) = (user, result) {
        queries::set_user_pdf_delivered(&conn, &user.id, true)?;
    }

    Ok(())
}
