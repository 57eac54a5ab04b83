use crate::{BandwidthEnvelope, Direction, EventKind};

/// One persisted row per observed bandwidth event. Append-only; the id is
/// generated at write time and never comes from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBandwidthRecord {
    pub id: String,
    pub node_id: String,
    pub timestamp: i64,
    pub kind: EventKind,
    pub bytes_count: u64,
    pub content_id: String,
    pub ip: String,
}

impl RawBandwidthRecord {
    /// Build a record from a batched envelope with a freshly generated id.
    pub fn from_envelope(id: String, envelope: &BandwidthEnvelope) -> Self {
        Self {
            id,
            node_id: envelope.event.node_id.clone(),
            timestamp: envelope.event.timestamp,
            kind: envelope.kind,
            bytes_count: envelope.event.bytes_count,
            content_id: envelope.event.content_id.clone(),
            ip: envelope.event.ip.clone(),
        }
    }
}

/// Per-node running totals, one row per node. Columns only ever grow while
/// the node exists; the row is created on the node's first statistics event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatistics {
    pub node_id: String,
    pub upload_bytes_count: u64,
    pub download_bytes_count: u64,
}

impl NodeStatistics {
    pub fn for_direction(&self, direction: Direction) -> u64 {
        match direction {
            Direction::Upload => self.upload_bytes_count,
            Direction::Download => self.download_bytes_count,
        }
    }
}
