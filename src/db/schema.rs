use rusqlite::Connection;

/// Initialize the database schema
pub fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- Buyers (identity - deduplicated by email, never deleted)
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            email TEXT NOT NULL UNIQUE,
            phone TEXT NOT NULL,
            name TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            pdf_delivered INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);

        -- Orders, keyed by the gateway-assigned order id.
        -- status is the only field the confirmation paths race on; transitions
        -- are conditional UPDATEs so concurrent confirmations resolve in SQLite.
        CREATE TABLE IF NOT EXISTS orders (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL REFERENCES users(id),
            razorpay_order_id TEXT NOT NULL UNIQUE,
            razorpay_payment_id TEXT,
            razorpay_signature TEXT,
            amount INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'created'
                CHECK (status IN ('created', 'paid', 'failed', 'refunded')),
            created_at INTEGER NOT NULL,
            paid_at INTEGER,
            email_sent INTEGER NOT NULL DEFAULT 0
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_orders_gateway ON orders(razorpay_order_id);
        CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id);
        CREATE INDEX IF NOT EXISTS idx_orders_unpaid ON orders(created_at) WHERE status = 'created';
        "#,
    )
}
