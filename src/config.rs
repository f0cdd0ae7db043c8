use std::env;

/// Razorpay API credentials and webhook secret, injected at construction.
#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    /// Public key id, safe to hand to the checkout page
    pub key_id: String,
    /// Secret key, signs client verification payloads
    pub key_secret: String,
    /// Shared secret for webhook signature verification
    pub webhook_secret: String,
}

/// Email delivery settings. `api_key = None` disables delivery (log only).
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_key: Option<String>,
    pub from_email: String,
    pub from_name: String,
    pub product_name: String,
    /// Path to the PDF shipped as the fulfillment attachment
    pub pdf_path: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub dev_mode: bool,
    /// Days before abandoned (unpaid) orders are purged on startup; 0 = never
    pub order_retention_days: i64,
    /// Product price in rupees; orders are created in paise (x100)
    pub product_price: i64,
    pub razorpay: RazorpayConfig,
    pub email: EmailConfig,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("BOOKSTALL_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let razorpay = RazorpayConfig {
            key_id: env::var("RAZORPAY_KEY_ID").unwrap_or_default(),
            key_secret: env::var("RAZORPAY_KEY_SECRET").unwrap_or_default(),
            webhook_secret: env::var("RAZORPAY_WEBHOOK_SECRET").unwrap_or_default(),
        };

        let email = EmailConfig {
            api_key: env::var("SENDGRID_API_KEY").ok().filter(|k| !k.is_empty()),
            from_email: env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "orders@bookstall.local".to_string()),
            from_name: env::var("EMAIL_FROM_NAME").unwrap_or_else(|_| "Bookstall".to_string()),
            product_name: env::var("PRODUCT_NAME")
                .unwrap_or_else(|_| "Interview Questions eBook".to_string()),
            pdf_path: env::var("PRODUCT_PDF_PATH")
                .unwrap_or_else(|_| "assets/product.pdf".to_string()),
        };

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "bookstall.db".to_string()),
            dev_mode,
            order_retention_days: env::var("ORDER_RETENTION_DAYS")
                .ok()
                .and_then(|d| d.parse().ok())
                .unwrap_or(0),
            product_price: env::var("PRODUCT_PRICE")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1233),
            razorpay,
            email,
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
