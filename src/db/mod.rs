mod from_row;
mod schema;
pub mod queries;

pub use schema::init_db;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::email::EmailService;
use crate::payments::RazorpayClient;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Application state holding the database pool and external collaborators
#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    /// Payment gateway client (order creation + signature verification)
    pub razorpay: RazorpayClient,
    /// Fulfillment email sender
    pub email: EmailService,
    /// Product price in rupees; gateway orders are created in paise
    pub product_price: i64,
}

pub fn create_pool(database_path: &str) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(database_path);
    Pool::builder().max_size(10).build(manager)
}
