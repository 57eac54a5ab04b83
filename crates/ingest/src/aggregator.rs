use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use meterhub_batch::BatchSink;
use meterhub_core::{BandwidthEnvelope, EventKind, IdSource, KindClass, RawBandwidthRecord};
use meterhub_store::{StoreResult, UsageStore};

/// Turns one flushed batch into grouped aggregate writes.
///
/// The batch is partitioned by event kind, keeping arrival order within each
/// group, and groups are written in group-key order. Raw kinds become one
/// multi-row insert per group with a fresh id per record; statistics kinds
/// become running-total upserts. A failing group is logged and dropped
/// without touching the remaining groups.
pub struct BandwidthAggregator {
    store: Arc<dyn UsageStore>,
    ids: Arc<dyn IdSource>,
}

impl BandwidthAggregator {
    pub fn new(store: Arc<dyn UsageStore>, ids: Arc<dyn IdSource>) -> Self {
        Self { store, ids }
    }

    async fn write_group(&self, kind: EventKind, group: &[BandwidthEnvelope]) -> StoreResult<()> {
        match kind.class() {
            KindClass::Raw => {
                let records: Vec<RawBandwidthRecord> = group
                    .iter()
                    .map(|envelope| {
                        RawBandwidthRecord::from_envelope(self.ids.new_id(), envelope)
                    })
                    .collect();
                self.store.insert_raw(kind.direction(), &records).await
            }
            KindClass::Statistics => {
                let deltas: Vec<(String, u64)> = group
                    .iter()
                    .map(|envelope| (envelope.event.node_id.clone(), envelope.event.bytes_count))
                    .collect();
                self.store.add_to_statistics(kind.direction(), &deltas).await
            }
            KindClass::Totals => {
                // Totals kinds are never routed into the batcher; a group of
                // them carries nothing to persist.
                warn!(kind = %kind, size = group.len(), "totals kind in write path, skipping group");
                Ok(())
            }
        }
    }
}

#[async_trait]
impl BatchSink<BandwidthEnvelope> for BandwidthAggregator {
    async fn flush(&self, batch: Vec<BandwidthEnvelope>) -> anyhow::Result<()> {
        let mut groups: BTreeMap<EventKind, Vec<BandwidthEnvelope>> = BTreeMap::new();
        for envelope in batch {
            groups.entry(envelope.kind).or_default().push(envelope);
        }

        for (kind, group) in &groups {
            debug!(kind = %kind, size = group.len(), "writing event group");
            if let Err(error) = self.write_group(*kind, group).await {
                // Contained per group: the rest of the batch still lands.
                warn!(kind = %kind, size = group.len(), %error, "aggregate write failed, dropping group");
            }
        }
        Ok(())
    }
}
