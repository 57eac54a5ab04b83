use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::EventKind;

/// Base identity + time carried by every telemetry fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeEvent {
    pub node_id: String,
    pub timestamp: i64,
}

/// A single bandwidth observation from a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandwidthEvent {
    pub node_id: String,
    pub timestamp: i64,
    pub content_id: String,
    pub bytes_count: u64,
    pub ip: String,
}

impl BandwidthEvent {
    pub fn node_event(&self) -> NodeEvent {
        NodeEvent {
            node_id: self.node_id.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Wire-level inbound message wrapper. The `type` string is resolved against
/// the [`EventKind`] registry at dispatch time; the payload stays opaque
/// until the selected handler decodes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: Value,
}

/// A decoded bandwidth event together with the kind it arrived under.
/// This is the item type flowing through the batcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BandwidthEnvelope {
    pub kind: EventKind,
    pub event: BandwidthEvent,
}

/// Reply to a totals query, sent back on the originating connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalsReply {
    pub node_id: String,
    pub timestamp: i64,
    pub bytes_count: u64,
}

/// Best-effort error reply for protocol errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReply {
    pub error: String,
}
