//! Signal Grid Server
//!
//! Runs the HTTP API and the scan loop in one process so both see the same
//! cooldown, rate-limit and tier state.

use dotenvy::dotenv;
use signalgrid::config::GridConfig;
use signalgrid::core::bootstrap::GridApp;
use signalgrid::core::http::start_server;
use signalgrid::logging;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    let config = GridConfig::from_env();
    logging::init_logging(&config.environment);

    info!("Starting Signal Grid Server");
    info!(environment = %config.environment, "Environment");
    info!(port = config.port, "HTTP Server: http://0.0.0.0:{}", config.port);

    let port = config.port;
    let app = GridApp::from_config(config)?;
    for engine in &app.engines {
        info!(
            engine = %engine.id,
            codename = %engine.codename,
            class = %engine.class,
            "Registered engine {}",
            engine.codename
        );
    }

    if app.config.scan_interval_seconds > 0 {
        info!(
            interval = app.config.scan_interval_seconds,
            "Scan loop: every {} seconds", app.config.scan_interval_seconds
        );
        app.scheduler.start().await?;
    } else {
        warn!("Scan loop disabled (set SCAN_INTERVAL_SECONDS to enable)");
    }

    let state = app.http_state(true);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(state, port).await {
            error!(error = %e, "HTTP server error");
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down...");
            app.scheduler.stop().await;
            info!("Server stopped");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
            app.scheduler.stop().await;
        }
    }

    Ok(())
}
