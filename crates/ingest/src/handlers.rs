use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use meterhub_batch::Batcher;
use meterhub_core::{
    BandwidthEnvelope, BandwidthEvent, EventHandler, EventKind, MeterHubError, NodeEvent,
    ReplySink, Result,
};

/// Inbound write handler: decodes the bandwidth payload and pushes it into
/// the shared batcher under the kind it was registered for. No reply is owed.
pub struct InboundBandwidthHandler {
    kind: EventKind,
    batcher: Arc<Batcher<BandwidthEnvelope>>,
}

impl InboundBandwidthHandler {
    pub fn new(kind: EventKind, batcher: Arc<Batcher<BandwidthEnvelope>>) -> Self {
        Self { kind, batcher }
    }
}

#[async_trait]
impl EventHandler for InboundBandwidthHandler {
    async fn handle(&self, payload: Value, _reply: &dyn ReplySink) -> Result<()> {
        let event: BandwidthEvent =
            serde_json::from_value(payload).map_err(|e| MeterHubError::HandlerFailed {
                kind: self.kind.as_str().to_string(),
                message: e.to_string(),
            })?;
        self.batcher
            .enqueue(vec![BandwidthEnvelope {
                kind: self.kind,
                event,
            }])
            .await;
        Ok(())
    }
}

/// Outbound read handler: bypasses the batcher and answers on the
/// originating connection via the totals service.
pub struct TotalsRequestHandler {
    service: crate::TotalsQueryService,
}

impl TotalsRequestHandler {
    pub fn new(service: crate::TotalsQueryService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl EventHandler for TotalsRequestHandler {
    async fn handle(&self, payload: Value, reply: &dyn ReplySink) -> Result<()> {
        let event: NodeEvent =
            serde_json::from_value(payload).map_err(|e| MeterHubError::HandlerFailed {
                kind: "totals request".to_string(),
                message: e.to_string(),
            })?;
        self.service.get_total(&event, reply).await;
        Ok(())
    }
}
