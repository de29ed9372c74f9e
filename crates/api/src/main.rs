use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use attendance_api::app::{create_app, AppState};
use attendance_api::config::Config;
use attendance_api::jobs::{JobScheduler, OtpCleanupJob, PoolMetricsJob};
use attendance_api::middleware::{init_logging, init_metrics};
use attendance_api::services::EmailNotifier;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;
    init_logging(&config.logging);
    init_metrics().context("Failed to install metrics recorder")?;

    info!("Starting attendance API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&(&config.database).into())
        .await
        .context("Failed to connect to database")?;

    info!("Running database migrations...");
    persistence::db::run_migrations(&pool).await?;
    info!("Migrations completed");

    let notifier = EmailNotifier::new(config.email.clone())?;
    info!(provider = notifier.provider_name(), "Passcode delivery configured");

    let addr = config.socket_addr().context("Invalid server address")?;
    let cleanup_interval = config.attendance.otp_cleanup_interval_secs;

    let state = AppState::new(
        config,
        persistence::pg_stores(pool.clone()),
        Arc::new(notifier),
    )?;

    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool));
    if cleanup_interval > 0 {
        scheduler.register(
            OtpCleanupJob::new(state.credentials.clone(), cleanup_interval)
                .with_rate_limiter(state.otp_limiter.clone()),
        );
    }
    scheduler.start();

    let app = create_app(state);

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
