//! Heartmux API Server
//!
//! Serves the demo routing tree: global decorators around every request,
//! ungrouped health and metrics routes, and nested `/api` groups.

use dotenvy::dotenv;
use heartmux::config::{get_environment, ServerConfig};
use heartmux::core::http::start_server;
use heartmux::logging;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let config = ServerConfig::from_env()?;
    let port = config.port;

    info!("Starting Heartmux API Server");
    info!(environment = %get_environment(), "Environment");
    info!(port = port, "HTTP Server: http://0.0.0.0:{}", port);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(port).await {
            error!(error = %e, "HTTP server error");
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down API server...");
        }
        _ = server_handle => {
            error!("HTTP server stopped");
        }
    }

    Ok(())
}
