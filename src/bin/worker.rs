//! Signal Grid Worker
//!
//! Runs the scan loop without the HTTP surface.

use dotenvy::dotenv;
use signalgrid::config::GridConfig;
use signalgrid::core::bootstrap::GridApp;
use signalgrid::logging;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    let config = GridConfig::from_env();
    logging::init_logging(&config.environment);

    info!("Starting Signal Grid Worker");
    info!(environment = %config.environment, "Environment");

    if config.scan_interval_seconds == 0 {
        return Err("SCAN_INTERVAL_SECONDS must be > 0 for the worker".into());
    }

    let app = GridApp::from_config(config)?;
    info!(
        engines = app.engines.len(),
        interval = app.config.scan_interval_seconds,
        subject = %app.config.subject_id,
        "Scan loop: {} engines every {} seconds",
        app.engines.len(),
        app.config.scan_interval_seconds
    );
    app.scheduler.start().await?;

    info!("Worker started, waiting for shutdown signal...");
    signal::ctrl_c().await?;
    info!("Shutting down worker...");
    app.scheduler.stop().await;
    info!("Worker stopped");

    Ok(())
}
