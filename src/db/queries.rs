use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{query_one, ORDER_COLS, USER_COLS};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

// ============ Users ============

/// Create a user. Email is normalized to lowercase for deduplication.
pub fn create_user(conn: &Connection, input: &CreateUser) -> Result<User> {
    let id = gen_id();
    let now = now();
    let email = input.email.trim().to_lowercase();
    let phone = input.phone.trim().to_string();

    conn.execute(
        "INSERT INTO users (id, email, phone, name, created_at, pdf_delivered)
         VALUES (?1, ?2, ?3, ?4, ?5, 0)",
        params![&id, &email, &phone, &input.name, now],
    )?;

    Ok(User {
        id,
        email,
        phone,
        name: input.name.clone(),
        created_at: now,
        pdf_delivered: false,
    })
}

pub fn get_user_by_id(conn: &Connection, id: &str) -> Result<Option<User>> {
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE id = ?1", USER_COLS),
        &[&id],
    )
}

pub fn get_user_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    let email = email.trim().to_lowercase();
    query_one(
        conn,
        &format!("SELECT {} FROM users WHERE email = ?1", USER_COLS),
        &[&email],
    )
}

/// Record that the PDF reached the user's inbox.
pub fn set_user_pdf_delivered(conn: &Connection, user_id: &str, delivered: bool) -> Result<()> {
    conn.execute(
        "UPDATE users SET pdf_delivered = ?1 WHERE id = ?2",
        params![delivered, user_id],
    )?;
    Ok(())
}

// ============ Orders ============

/// Create an order in `created` state against a gateway order id.
pub fn create_order(conn: &Connection, input: &CreateOrder) -> Result<Order> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO orders (id, user_id, razorpay_order_id, amount, status, created_at, email_sent)
         VALUES (?1, ?2, ?3, ?4, 'created', ?5, 0)",
        params![&id, &input.user_id, &input.razorpay_order_id, input.amount, now],
    )?;

    Ok(Order {
        id,
        user_id: input.user_id.clone(),
        razorpay_order_id: input.razorpay_order_id.clone(),
        razorpay_payment_id: None,
        razorpay_signature: None,
        amount: input.amount,
        status: OrderStatus::Created,
        created_at: now,
        paid_at: None,
        email_sent: false,
    })
}

pub fn get_order_by_gateway_id(conn: &Connection, razorpay_order_id: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!(
            "SELECT {} FROM orders WHERE razorpay_order_id = ?1",
            ORDER_COLS
        ),
        &[&razorpay_order_id],
    )
}

/// Atomically transition an order to `paid`, returning whether the claim won.
///
/// Uses compare-and-swap on status so the client-verify and webhook paths can
/// race for the same order: whichever commits first claims it, the other
/// observes zero affected rows and must not re-send the fulfillment email.
///
/// A `failed` order may still be claimed (payment retried successfully).
/// Payment id and signature keep earlier values when the trigger carries none.
///
/// Returns:
/// - `Ok(true)` if this call transitioned the order to `paid`
/// - `Ok(false)` if the order was already `paid` (or does not exist)
pub fn try_mark_order_paid(
    conn: &Connection,
    razorpay_order_id: &str,
    payment_id: Option<&str>,
    signature: Option<&str>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE orders
         SET status = 'paid',
             razorpay_payment_id = COALESCE(?2, razorpay_payment_id),
             razorpay_signature = COALESCE(?3, razorpay_signature),
             paid_at = ?4
         WHERE razorpay_order_id = ?1 AND status <> 'paid'",
        params![razorpay_order_id, payment_id, signature, now()],
    )?;
    Ok(affected > 0)
}

/// Atomically transition an order to `failed`, returning whether it applied.
///
/// Only `created` orders can fail; a confirmation that already won the race
/// is never overwritten by a late failure event.
pub fn try_mark_order_failed(
    conn: &Connection,
    razorpay_order_id: &str,
    payment_id: Option<&str>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE orders
         SET status = 'failed',
             razorpay_payment_id = COALESCE(?2, razorpay_payment_id)
         WHERE razorpay_order_id = ?1 AND status = 'created'",
        params![razorpay_order_id, payment_id],
    )?;
    Ok(affected > 0)
}

/// Record the outcome of a fulfillment email attempt.
pub fn set_order_email_sent(
    conn: &Connection,
    razorpay_order_id: &str,
    email_sent: bool,
) -> Result<()> {
    conn.execute(
        "UPDATE orders SET email_sent = ?1 WHERE razorpay_order_id = ?2",
        params![email_sent, razorpay_order_id],
    )?;
    Ok(())
}

/// Purge abandoned orders beyond the retention period.
/// Only deletes orders still in `created` state (abandoned checkouts);
/// paid and failed orders are kept as purchase records.
/// Returns the number of deleted records.
pub fn purge_old_unpaid_orders(conn: &Connection, retention_days: i64) -> Result<usize> {
    let cutoff = now() - (retention_days * 86400);
    let deleted = conn.execute(
        "DELETE FROM orders WHERE status = 'created' AND created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}
