use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bookstall::config::Config;
use bookstall::db::{create_pool, init_db, queries, AppState};
use bookstall::email::EmailService;
use bookstall::handlers;
use bookstall::payments::RazorpayClient;

#[derive(Parser, Debug)]
#[command(name = "bookstall")]
#[command(about = "Checkout and fulfillment server for a digital ebook storefront")]
struct Cli {
    /// Delete the database on exit (dev mode only, useful for fresh starts)
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bookstall=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env();

    if config.dev_mode {
        tracing::info!("Running in DEVELOPMENT mode");
    }
    if config.razorpay.key_id.is_empty() || config.razorpay.key_secret.is_empty() {
        tracing::warn!("Razorpay API keys not configured, order creation will fail");
    }
    if config.email.api_key.is_none() {
        tracing::warn!("No SendGrid API key configured, fulfillment emails are disabled");
    }

    // Create database connection pool and initialize the schema
    let db_pool = create_pool(&config.database_path).expect("Failed to create database pool");
    {
        let conn = db_pool.get().expect("Failed to get connection");
        init_db(&conn).expect("Failed to initialize database");
    }

    let state = AppState {
        db: db_pool,
        razorpay: RazorpayClient::new(&config.razorpay),
        email: EmailService::new(&config.email),
        product_price: config.product_price,
    };

    // Purge abandoned checkouts on startup (0 = never purge)
    if config.order_retention_days > 0 {
        let conn = state.db.get().expect("Failed to get connection for purge");
        match queries::purge_old_unpaid_orders(&conn, config.order_retention_days) {
            Ok(count) if count > 0 => {
                tracing::info!(
                    "Purged {} unpaid orders older than {} days",
                    count,
                    config.order_retention_days
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Failed to purge old unpaid orders: {}", e);
            }
        }
    }

    let app = handlers::router()
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    let cleanup_on_exit = cli.ephemeral && config.dev_mode;
    let db_path = config.database_path.clone();

    if cleanup_on_exit {
        tracing::info!("EPHEMERAL MODE: database will be deleted on exit");
    }

    tracing::info!("Bookstall server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Failed to start server");

    // Cleanup on exit if ephemeral mode
    if cleanup_on_exit {
        tracing::info!("Cleaning up ephemeral database...");
        if let Err(e) = std::fs::remove_file(&db_path) {
            tracing::warn!("Failed to remove {}: {}", db_path, e);
        } else {
            tracing::info!("Removed {}", db_path);
        }
        // Also remove WAL and SHM files if they exist
        let _ = std::fs::remove_file(format!("{}-wal", db_path));
        let _ = std::fs::remove_file(format!("{}-shm", db_path));
        tracing::info!("Ephemeral cleanup complete");
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received, stopping server...");
}
