use std::time::Duration;

use anyhow::{Context, Result};
use arts_booking_api::{
    app::{create_app, AppState},
    config::Config,
    jobs::{ExpirySweepJob, JobScheduler, PoolMetricsJob},
    middleware,
};
use tracing::info;

/// How long background jobs get to finish after shutdown is signalled.
const JOB_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    middleware::logging::init_logging(&config.logging)?;
    middleware::init_metrics().context("Failed to install metrics recorder")?;

    info!("Starting Arts Booking API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&(&config.database).into()).await?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let addr = config.socket_addr()?;
    let sweep_interval = config.booking.expiry_sweep_interval_minutes;
    let state = AppState::new(config, pool.clone()).context("Invalid auth configuration")?;

    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool));
    if sweep_interval > 0 {
        scheduler.register(ExpirySweepJob::new(
            state.group_bookings.clone(),
            sweep_interval,
        ));
    } else {
        info!("Expiry sweep disabled");
    }
    scheduler.start();

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(JOB_SHUTDOWN_TIMEOUT).await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
