use anyhow::{Context, Result};
use propsync::api::{create_router, ApiState};
use propsync::connectors::background_check::store::SqliteScreeningQueue;
use propsync::registry::ConnectorRegistry;
use propsync::scheduler::SyncScheduler;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "propsync=info".into()),
        )
        .init();

    info!("PropSync connector service starting...");

    // Read configuration from environment
    let screening_db = std::env::var("PROPSYNC_SCREENING_DB")
        .unwrap_or_else(|_| "screenings.db".to_string());

    let api_port: u16 = std::env::var("PROPSYNC_API_PORT")
        .unwrap_or_else(|_| "4000".to_string())
        .parse()
        .context("PROPSYNC_API_PORT must be a valid port number")?;

    let scheduler_tick_secs: u64 = std::env::var("PROPSYNC_SCHEDULER_TICK_SECS")
        .unwrap_or_else(|_| "30".to_string())
        .parse()
        .context("PROPSYNC_SCHEDULER_TICK_SECS must be a number of seconds")?;

    info!(
        screening_db = %screening_db,
        api_port = api_port,
        scheduler_tick_secs,
        "Configuration loaded"
    );

    // Initialize screening queue (shared by connectors and the API)
    let queue = Arc::new(
        SqliteScreeningQueue::new(&screening_db)
            .context("Failed to initialize screening queue")?,
    );
    info!("Screening queue initialized");

    // Connector registry; connectors are added at runtime via the API
    let registry = Arc::new(ConnectorRegistry::new());

    // Start the background sync scheduler
    let scheduler = SyncScheduler::with_tick(
        Arc::clone(&registry),
        std::time::Duration::from_secs(scheduler_tick_secs),
    );
    let scheduler_handle = scheduler.start();

    // Start HTTP API server
    let api_state = ApiState {
        registry: Arc::clone(&registry),
        queue,
    };
    let router = create_router(api_state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", api_port))
        .await
        .context("Failed to bind connector API port")?;
    info!(port = api_port, "Connector API listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "Connector API server error");
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl_c signal")?;
    info!("Shutdown signal received");

    // Graceful shutdown
    server_handle.abort();
    scheduler_handle.abort();
    info!("Connector service stopped");

    Ok(())
}
