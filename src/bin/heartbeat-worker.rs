//! Heartmux Heartbeat Worker
//!
//! Runs one heartbeat worker and logs its pulses and results until Ctrl-C.

use dotenvy::dotenv;
use heartmux::config::{get_environment, HeartbeatConfig};
use heartmux::core::runtime::HeartbeatRuntime;
use heartmux::logging;
use heartmux::metrics::Metrics;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let config = HeartbeatConfig::from_env()?;
    info!("Starting Heartmux Heartbeat Worker");
    info!(environment = %get_environment(), "Environment");
    info!(
        pulse_interval_ms = config.pulse_interval.as_millis() as u64,
        work_multiplier = config.work_multiplier,
        "Pulse every {:?}, result every {} pulses",
        config.pulse_interval,
        config.work_multiplier
    );

    let metrics = Arc::new(Metrics::new()?);
    let runtime = HeartbeatRuntime::new(config).with_metrics(metrics.clone());

    let token = CancellationToken::new();
    let monitor_token = token.clone();
    let monitor = tokio::spawn(async move { runtime.run(monitor_token).await });

    signal::ctrl_c().await?;
    info!("Shutting down heartbeat worker...");
    token.cancel();

    match monitor.await {
        Ok(report) => info!(
            pulses = report.pulses,
            results = report.results,
            stalls = report.stalls,
            "Heartbeat worker stopped"
        ),
        Err(e) => error!(error = %e, "Heartbeat monitor task failed"),
    }

    match metrics.export() {
        Ok(text) => info!(metrics = %text, "Final heartbeat metrics"),
        Err(e) => error!(error = %e, "Failed to export metrics"),
    }

    Ok(())
}
