//! ClubHub backend
//!
//! Main application entry point

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use clubhub::{
    config::{GatewayKind, Settings},
    database::{create_pool, run_migrations, DatabaseService},
    handlers::router,
    services::{FsBlobStore, MockPaymentGateway, PaymentGateway, RazorpayGateway, ServiceFactory},
    state::AppState,
    utils::logging,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate().context("invalid configuration")?;

    // Initialize logging; the guard flushes the file writer on exit
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}...", clubhub::info());

    // Initialize database connection
    info!("Connecting to database...");
    let db_pool = create_pool(&settings.database)
        .await
        .context("failed to connect to the database")?;

    info!("Running database migrations...");
    run_migrations(&db_pool)
        .await
        .context("failed to run migrations")?;

    let database_service = DatabaseService::new(db_pool);

    // Blob storage and payment gateway
    let blob_store = FsBlobStore::new(&settings.storage)?;
    let blob_root = blob_store.root().to_path_buf();

    let gateway: Arc<dyn PaymentGateway> = match settings.payments.gateway {
        GatewayKind::Razorpay => Arc::new(RazorpayGateway::new(&settings.payments)?),
        GatewayKind::Mock => {
            warn!("Using the mock payment gateway; no real orders will be created");
            MockPaymentGateway::shared()
        }
    };

    info!("Initializing services...");
    let services = ServiceFactory::with_database(
        &settings,
        database_service,
        Arc::new(blob_store),
        gateway,
    );

    let app = router(AppState::new(services), Some(blob_root));

    let address = settings.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    info!(address = %address, "ClubHub is listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("ClubHub has been shut down.");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
