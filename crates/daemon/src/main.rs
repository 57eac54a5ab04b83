//! MeterHub Daemon Binary
//!
//! Runs the bandwidth-telemetry hub: WebSocket ingestion, batched
//! aggregation into Postgres, and totals queries.

use meterhub_daemon::DaemonError;
use meterhub_settings::Settings;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,meterhub=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    init_logging();

    tracing::info!("Starting MeterHub daemon...");

    let settings = Settings::load_or_default()?;
    meterhub_daemon::run(settings).await?;

    tracing::info!("Daemon stopped");
    Ok(())
}
