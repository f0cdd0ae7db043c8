//! Test utilities and fixtures for bookstall integration tests

#![allow(dead_code)]

use axum::Router;
use hmac::{Hmac, Mac};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use sha2::Sha256;

pub use bookstall::config::{EmailConfig, RazorpayConfig};
pub use bookstall::db::{init_db, queries, AppState, DbPool};
pub use bookstall::email::EmailService;
pub use bookstall::handlers;
pub use bookstall::models::*;
pub use bookstall::payments::RazorpayClient;

pub const TEST_KEY_SECRET: &str = "test_key_secret_123";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_test123secret456";

pub fn test_razorpay_config() -> RazorpayConfig {
    RazorpayConfig {
        key_id: "rzp_test_key".to_string(),
        key_secret: TEST_KEY_SECRET.to_string(),
        webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
    }
}

/// Email config with no API key: dispatch resolves to NoApiKey without
/// touching the network, so handler tests can run the full flow.
pub fn test_email_config() -> EmailConfig {
    EmailConfig {
        api_key: None,
        from_email: "orders@test.local".to_string(),
        from_name: "Test Stall".to_string(),
        product_name: "Test eBook".to_string(),
        pdf_path: "does-not-exist.pdf".to_string(),
    }
}

/// Create an in-memory test database with schema initialized
pub fn setup_test_db() -> Connection {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
    init_db(&conn).expect("Failed to initialize schema");
    conn
}

/// Create a test app state over a single-connection in-memory pool.
///
/// Pool size must stay at 1: each SQLite `:memory:` connection is its own
/// database, so a second connection would see an empty schema.
pub fn create_test_app_state() -> AppState {
    let manager = SqliteConnectionManager::memory();
    let pool: DbPool = Pool::builder()
        .max_size(1)
        .build(manager)
        .expect("Failed to build test pool");
    {
        let conn = pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize schema");
    }

    AppState {
        db: pool,
        razorpay: RazorpayClient::new(&test_razorpay_config()),
        email: EmailService::new(&test_email_config()),
        product_price: 1233,
    }
}

/// Build the full application router for oneshot requests
pub fn app(state: AppState) -> Router {
    handlers::router().with_state(state)
}

/// Create a test user with default values
pub fn create_test_user(conn: &Connection, email: &str) -> User {
    queries::create_user(
        conn,
        &CreateUser {
            name: "Test Buyer".to_string(),
            email: email.to_string(),
            phone: "9876543210".to_string(),
        },
    )
    .expect("Failed to create test user")
}

/// Create a test order in `created` state
pub fn create_test_order(
    conn: &Connection,
    user_id: &str,
    razorpay_order_id: &str,
    amount: i64,
) -> Order {
    queries::create_order(
        conn,
        &CreateOrder {
            user_id: user_id.to_string(),
            razorpay_order_id: razorpay_order_id.to_string(),
            amount,
        },
    )
    .expect("Failed to create test order")
}

fn hmac_hex(secret: &str, data: &[u8]) -> String {
    type HmacSha256 = Hmac<Sha256>;
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Compute the signature a client submits after checkout
pub fn payment_signature(order_id: &str, payment_id: &str) -> String {
    hmac_hex(
        TEST_KEY_SECRET,
        format!("{}|{}", order_id, payment_id).as_bytes(),
    )
}

/// Compute the signature the gateway puts in X-Razorpay-Signature
pub fn webhook_signature(payload: &[u8]) -> String {
    hmac_hex(TEST_WEBHOOK_SECRET, payload)
}
