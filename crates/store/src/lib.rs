//! MeterHub Persistence
//!
//! The store is the system's only durable collaborator. It is reached
//! through the [`UsageStore`] trait so the write path (aggregate inserts,
//! running-total upserts) and the read path (totals queries) can run against
//! Postgres in production and the in-memory twin in tests.

use async_trait::async_trait;
use thiserror::Error;

use meterhub_core::{Direction, NodeStatistics, RawBandwidthRecord};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PostgresConfig, PostgresStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Aggregate write and totals read capability.
///
/// Every method is parameterized end to end; client-controlled strings
/// (node ids, content ids, addresses) never reach the store as statement
/// text.
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// Append all records to the direction's raw table as one multi-row
    /// write. Ids are already assigned by the caller.
    async fn insert_raw(
        &self,
        direction: Direction,
        records: &[RawBandwidthRecord],
    ) -> StoreResult<()>;

    /// Apply `(node_id, bytes)` increments to the direction's running-total
    /// column, in order. Each increment is an atomic upsert: it creates the
    /// node's row with the delta (other direction zero) when absent, and
    /// adds to the existing column otherwise.
    async fn add_to_statistics(
        &self,
        direction: Direction,
        deltas: &[(String, u64)],
    ) -> StoreResult<()>;

    /// The node's current running totals, or `None` before its first
    /// statistics event.
    async fn node_statistics(&self, node_id: &str) -> StoreResult<Option<NodeStatistics>>;

    async fn health_check(&self) -> StoreResult<()>;

    fn backend_name(&self) -> &'static str;
}
