use std::sync::Arc;

use tracing::{error, warn};

use meterhub_core::{Direction, NodeEvent, ReplySink, TotalsReply};
use meterhub_store::UsageStore;

/// Read path for running totals. One instance per request kind: the
/// direction is fixed at construction, so an unsupported request type is a
/// wiring mistake and never a runtime branch.
pub struct TotalsQueryService {
    store: Arc<dyn UsageStore>,
    direction: Direction,
}

impl TotalsQueryService {
    pub fn new(store: Arc<dyn UsageStore>, direction: Direction) -> Self {
        Self { store, direction }
    }

    /// Look up the node's running total and reply on the originating
    /// connection. A node with no statistics row reports zero. A store
    /// failure is logged and produces no reply; the caller owns its timeout.
    pub async fn get_total(&self, event: &NodeEvent, reply: &dyn ReplySink) {
        let statistics = match self.store.node_statistics(&event.node_id).await {
            Ok(statistics) => statistics,
            Err(error) => {
                error!(node_id = %event.node_id, %error, "totals query failed, no reply sent");
                return;
            }
        };

        let bytes_count = statistics
            .map(|row| row.for_direction(self.direction))
            .unwrap_or(0);

        let totals = TotalsReply {
            node_id: event.node_id.clone(),
            timestamp: event.timestamp,
            bytes_count,
        };
        let frame = match serde_json::to_string(&totals) {
            Ok(frame) => frame,
            Err(error) => {
                error!(node_id = %event.node_id, %error, "failed to encode totals reply");
                return;
            }
        };
        if let Err(error) = reply.send(frame).await {
            warn!(node_id = %event.node_id, %error, "totals reply could not be delivered");
        }
    }
}
