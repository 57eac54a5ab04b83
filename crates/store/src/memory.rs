//! In-memory usage store.
//!
//! Behavioral twin of the Postgres store for tests: same upsert semantics,
//! plus write/read failure injection and call counters so tests can assert
//! that a flushed group produced exactly one aggregate write.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use meterhub_core::{Direction, NodeStatistics, RawBandwidthRecord};

use crate::{StoreError, StoreResult, UsageStore};

#[derive(Default)]
struct Tables {
    upload_raw: Vec<RawBandwidthRecord>,
    download_raw: Vec<RawBandwidthRecord>,
    statistics: BTreeMap<String, NodeStatistics>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    raw_insert_calls: AtomicUsize,
    statistics_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the direction's raw table.
    pub fn raw_rows(&self, direction: Direction) -> Vec<RawBandwidthRecord> {
        let tables = self.tables.lock().unwrap();
        match direction {
            Direction::Upload => tables.upload_raw.clone(),
            Direction::Download => tables.download_raw.clone(),
        }
    }

    /// Current statistics row for a node, if any.
    pub fn statistics_row(&self, node_id: &str) -> Option<NodeStatistics> {
        self.tables.lock().unwrap().statistics.get(node_id).cloned()
    }

    /// How many multi-row raw inserts have been issued.
    pub fn raw_insert_calls(&self) -> usize {
        self.raw_insert_calls.load(Ordering::SeqCst)
    }

    /// How many statistics write calls have been issued.
    pub fn statistics_calls(&self) -> usize {
        self.statistics_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl UsageStore for MemoryStore {
    async fn insert_raw(
        &self,
        direction: Direction,
        records: &[RawBandwidthRecord],
    ) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write failure injected".to_string()));
        }
        if records.is_empty() {
            return Ok(());
        }
        self.raw_insert_calls.fetch_add(1, Ordering::SeqCst);

        let mut tables = self.tables.lock().unwrap();
        let table = match direction {
            Direction::Upload => &mut tables.upload_raw,
            Direction::Download => &mut tables.download_raw,
        };
        table.extend_from_slice(records);
        Ok(())
    }

    async fn add_to_statistics(
        &self,
        direction: Direction,
        deltas: &[(String, u64)],
    ) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write failure injected".to_string()));
        }
        if deltas.is_empty() {
            return Ok(());
        }
        self.statistics_calls.fetch_add(1, Ordering::SeqCst);

        let mut tables = self.tables.lock().unwrap();
        for (node_id, bytes) in deltas {
            let row = tables
                .statistics
                .entry(node_id.clone())
                .or_insert_with(|| NodeStatistics {
                    node_id: node_id.clone(),
                    upload_bytes_count: 0,
                    download_bytes_count: 0,
                });
            match direction {
                Direction::Upload => row.upload_bytes_count += bytes,
                Direction::Download => row.download_bytes_count += bytes,
            }
        }
        Ok(())
    }

    async fn node_statistics(&self, node_id: &str) -> StoreResult<Option<NodeStatistics>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read failure injected".to_string()));
        }
        Ok(self.statistics_row(node_id))
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meterhub_core::EventKind;

    fn record(id: &str, node_id: &str, bytes: u64) -> RawBandwidthRecord {
        RawBandwidthRecord {
            id: id.to_string(),
            node_id: node_id.to_string(),
            timestamp: 100,
            kind: EventKind::BandwidthUpload,
            bytes_count: bytes,
            content_id: "c1".to_string(),
            ip: "10.0.0.1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_raw_appends_in_order() {
        let store = MemoryStore::new();
        store
            .insert_raw(
                Direction::Upload,
                &[record("a", "n1", 10), record("b", "n1", 20)],
            )
            .await
            .unwrap();

        let rows = store.raw_rows(Direction::Upload);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "a");
        assert_eq!(rows[1].id, "b");
        assert!(store.raw_rows(Direction::Download).is_empty());
        assert_eq!(store.raw_insert_calls(), 1);
    }

    #[tokio::test]
    async fn test_first_statistics_event_creates_row_with_other_column_zero() {
        let store = MemoryStore::new();
        store
            .add_to_statistics(Direction::Upload, &[("n1".to_string(), 500)])
            .await
            .unwrap();

        let row = store.statistics_row("n1").unwrap();
        assert_eq!(row.upload_bytes_count, 500);
        assert_eq!(row.download_bytes_count, 0);
    }

    #[tokio::test]
    async fn test_statistics_increments_accumulate() {
        let store = MemoryStore::new();
        store
            .add_to_statistics(Direction::Upload, &[("n1".to_string(), 500)])
            .await
            .unwrap();
        store
            .add_to_statistics(Direction::Download, &[("n1".to_string(), 30)])
            .await
            .unwrap();
        store
            .add_to_statistics(Direction::Upload, &[("n1".to_string(), 1)])
            .await
            .unwrap();

        let row = store.statistics_row("n1").unwrap();
        assert_eq!(row.upload_bytes_count, 501);
        assert_eq!(row.download_bytes_count, 30);
    }

    #[tokio::test]
    async fn test_node_statistics_missing_row_is_none() {
        let store = MemoryStore::new();
        assert!(store.node_statistics("absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);
        let result = store.insert_raw(Direction::Upload, &[record("a", "n1", 1)]).await;
        assert!(result.is_err());
        assert_eq!(store.raw_insert_calls(), 0);

        store.set_fail_writes(false);
        store.set_fail_reads(true);
        assert!(store.node_statistics("n1").await.is_err());
    }
}
