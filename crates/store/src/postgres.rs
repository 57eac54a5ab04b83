//! Postgres-backed implementation of the usage store.
//!
//! All statements are parameterized; multi-row raw inserts are built with
//! `QueryBuilder::push_values` so one flushed group becomes one write call.
//! Running-total updates use a single atomic upsert per increment
//! (`ON CONFLICT ... DO UPDATE SET col = col + EXCLUDED.col`), which creates
//! the row with the delta when absent and adds to it otherwise.
//!
//! Connection pooling and the acquire timeout are explicit configuration —
//! a store that hangs forever on a dead database is not acceptable on the
//! flush path.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{PgPool, QueryBuilder, Row};
use tracing::info;

use meterhub_core::{Direction, NodeStatistics, RawBandwidthRecord};

use crate::{StoreResult, UsageStore};

/// Postgres connection settings.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://meterhub@localhost/meterhub".to_string(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Durable usage store backed by Postgres.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect, apply embedded migrations, and return the ready store.
    pub async fn connect(config: &PostgresConfig) -> StoreResult<Self> {
        let options = PgConnectOptions::from_str(&config.url)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!(max_connections = config.max_connections, "connected to postgres");

        Ok(Self { pool })
    }

    fn raw_table(direction: Direction) -> &'static str {
        match direction {
            Direction::Upload => "bandwidth_upload",
            Direction::Download => "bandwidth_download",
        }
    }
}

#[async_trait]
impl UsageStore for PostgresStore {
    async fn insert_raw(
        &self,
        direction: Direction,
        records: &[RawBandwidthRecord],
    ) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<sqlx::Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} (id, node_id, timestamp, kind, bytes_count, content_id, ip) ",
            Self::raw_table(direction)
        ));
        builder.push_values(records, |mut row, record| {
            row.push_bind(&record.id)
                .push_bind(&record.node_id)
                .push_bind(record.timestamp)
                .push_bind(record.kind.as_str())
                .push_bind(record.bytes_count as i64)
                .push_bind(&record.content_id)
                .push_bind(&record.ip);
        });
        builder.build().execute(&self.pool).await?;
        Ok(())
    }

    async fn add_to_statistics(
        &self,
        direction: Direction,
        deltas: &[(String, u64)],
    ) -> StoreResult<()> {
        for (node_id, bytes) in deltas {
            let (upload_delta, download_delta) = match direction {
                Direction::Upload => (*bytes as i64, 0i64),
                Direction::Download => (0i64, *bytes as i64),
            };
            sqlx::query(
                "INSERT INTO nodestatistics \
                 (node_id, bandwidth_upload_bytes_count, bandwidth_download_bytes_count) \
                 VALUES ($1, $2, $3) \
                 ON CONFLICT (node_id) DO UPDATE SET \
                 bandwidth_upload_bytes_count = \
                 nodestatistics.bandwidth_upload_bytes_count + EXCLUDED.bandwidth_upload_bytes_count, \
                 bandwidth_download_bytes_count = \
                 nodestatistics.bandwidth_download_bytes_count + EXCLUDED.bandwidth_download_bytes_count",
            )
            .bind(node_id)
            .bind(upload_delta)
            .bind(download_delta)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn node_statistics(&self, node_id: &str) -> StoreResult<Option<NodeStatistics>> {
        let row = sqlx::query(
            "SELECT node_id, bandwidth_upload_bytes_count, bandwidth_download_bytes_count \
             FROM nodestatistics WHERE node_id = $1",
        )
        .bind(node_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| NodeStatistics {
            node_id: row.get("node_id"),
            upload_bytes_count: row.get::<i64, _>("bandwidth_upload_bytes_count").max(0) as u64,
            download_bytes_count: row.get::<i64, _>("bandwidth_download_bytes_count").max(0) as u64,
        }))
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
