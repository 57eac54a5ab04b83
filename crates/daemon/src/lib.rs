//! MeterHub Daemon
//!
//! Startup wiring: constructs the store, batcher, aggregator, totals
//! services, and router, then runs the WebSocket server until shutdown.
//! On shutdown the batcher is drained so buffered events still land.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use meterhub_batch::{BatchConfig, Batcher};
use meterhub_core::{BandwidthEnvelope, Direction, EventKind, UuidSource};
use meterhub_ingest::{
    BandwidthAggregator, InboundBandwidthHandler, TotalsQueryService, TotalsRequestHandler,
};
use meterhub_server::{EventRouter, ServerConfig, ServerError, WsServer};
use meterhub_settings::Settings;
use meterhub_store::{PostgresConfig, PostgresStore, StoreError, UsageStore};

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Settings error: {0}")]
    Settings(#[from] meterhub_settings::SettingsError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Bind a handler for every event kind the hub serves. The four write kinds
/// feed the shared batcher; the two totals kinds read the store directly.
/// Registration happens exactly once, here.
pub fn build_router(
    batcher: Arc<Batcher<BandwidthEnvelope>>,
    store: Arc<dyn UsageStore>,
) -> EventRouter {
    EventRouter::builder()
        .register(
            EventKind::BandwidthUpload,
            Arc::new(InboundBandwidthHandler::new(
                EventKind::BandwidthUpload,
                batcher.clone(),
            )),
        )
        .register(
            EventKind::BandwidthDownload,
            Arc::new(InboundBandwidthHandler::new(
                EventKind::BandwidthDownload,
                batcher.clone(),
            )),
        )
        .register(
            EventKind::BandwidthUploadStatistics,
            Arc::new(InboundBandwidthHandler::new(
                EventKind::BandwidthUploadStatistics,
                batcher.clone(),
            )),
        )
        .register(
            EventKind::BandwidthDownloadStatistics,
            Arc::new(InboundBandwidthHandler::new(
                EventKind::BandwidthDownloadStatistics,
                batcher,
            )),
        )
        .register(
            EventKind::BandwidthUploadTotal,
            Arc::new(TotalsRequestHandler::new(TotalsQueryService::new(
                store.clone(),
                Direction::Upload,
            ))),
        )
        .register(
            EventKind::BandwidthDownloadTotal,
            Arc::new(TotalsRequestHandler::new(TotalsQueryService::new(
                store,
                Direction::Download,
            ))),
        )
        .build()
}

/// Run the hub until ctrl-c, then drain buffered events.
pub async fn run(settings: Settings) -> Result<(), DaemonError> {
    let store: Arc<dyn UsageStore> = Arc::new(
        PostgresStore::connect(&PostgresConfig {
            url: settings.database.url.clone(),
            max_connections: settings.database.max_connections,
            acquire_timeout: Duration::from_secs(settings.database.acquire_timeout_secs),
        })
        .await?,
    );
    store.health_check().await?;
    info!(backend = store.backend_name(), "store ready");

    let aggregator = Arc::new(BandwidthAggregator::new(
        store.clone(),
        Arc::new(UuidSource),
    ));
    let batcher = Arc::new(Batcher::new(
        BatchConfig {
            max_batch_size: settings.batch.max_batch_size,
            max_delay: Duration::from_millis(settings.batch.max_delay_ms),
            max_buffered: settings.batch.max_buffered,
        },
        aggregator,
    ));

    let router = Arc::new(build_router(batcher.clone(), store));
    let server = WsServer::bind(
        ServerConfig {
            listen_addr: settings.server.listen_addr.clone(),
            heartbeat_interval: Duration::from_secs(settings.server.heartbeat_interval_secs),
        },
        router,
    )
    .await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    info!("Draining buffered events before exit");
    batcher.drain().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use meterhub_store::MemoryStore;

    #[tokio::test]
    async fn test_build_router_registers_all_kinds() {
        let store: Arc<dyn UsageStore> = Arc::new(MemoryStore::new());
        let aggregator = Arc::new(BandwidthAggregator::new(
            store.clone(),
            Arc::new(UuidSource),
        ));
        let batcher = Arc::new(Batcher::new(BatchConfig::default(), aggregator));

        let router = build_router(batcher, store);
        for kind in EventKind::ALL {
            assert!(router.is_registered(kind), "missing handler for {kind}");
        }
    }
}
