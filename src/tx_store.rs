//! Durable store of enriched swap transactions, keyed by transaction hash.
//!
//! Inserts are idempotent (`ON CONFLICT DO NOTHING`): a batch re-run over an
//! already-ingested window is a no-op rather than an error. `gas_price_wei`
//! is a NUMERIC column; wei amounts do not reliably fit BIGINT.

use crate::errors::StoreError;
use crate::types::TxWithPrice;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

/// A persisted enriched transaction row.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct TransactionRecord {
    pub transaction_hash: String,
    pub block_number: i64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub timestamp: DateTime<Utc>,
    pub gas_used: i64,
    /// Serializes as a decimal string, preserving full wei precision on the wire.
    pub gas_price_wei: Decimal,
    pub transaction_fee_eth: Option<f64>,
    pub transaction_fee_usdt: Option<f64>,
    pub eth_usdt_price: Option<f64>,
}

impl TransactionRecord {
    pub fn from_enriched(tx: &TxWithPrice) -> Result<Self, StoreError> {
        let gas_price_wei = Decimal::from_str(&tx.data.gas_price_wei.to_string())
            .map_err(|e| StoreError::InvalidRecord(format!("gas_price_wei: {e}")))?;

        Ok(Self {
            transaction_hash: tx.data.hash.clone(),
            block_number: tx.data.block_number as i64,
            timestamp: tx.data.timestamp,
            gas_used: tx.data.gas_used as i64,
            gas_price_wei,
            transaction_fee_eth: Some(tx.fee_eth),
            transaction_fee_usdt: Some(tx.fee_usdt),
            eth_usdt_price: Some(tx.eth_usdt_price),
        })
    }
}

/// Durable transaction persistence consumed by the processors and the API.
#[async_trait]
pub trait TransactionStore: Send + Sync + std::fmt::Debug {
    /// Inserts an enriched transaction; a hash collision is silently ignored.
    async fn insert(&self, tx: &TxWithPrice) -> Result<(), StoreError>;

    /// Looks a record up by hash, or [`StoreError::NotFound`].
    async fn by_hash(&self, hash: &str) -> Result<TransactionRecord, StoreError>;

    /// The most recent `limit` records by timestamp.
    async fn latest(&self, limit: i64) -> Result<Vec<TransactionRecord>, StoreError>;

    /// Records whose timestamp lies in the inclusive `[start, end]` window.
    async fn by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, StoreError>;
}

#[derive(Debug, Clone)]
pub struct PgTransactionStore {
    pool: PgPool,
}

impl PgTransactionStore {
    /// Connects to Postgres and applies the schema idempotently.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transactions (
                transaction_hash     TEXT PRIMARY KEY,
                block_number         BIGINT NOT NULL,
                timestamp            TIMESTAMPTZ NOT NULL,
                gas_used             BIGINT NOT NULL,
                gas_price_wei        NUMERIC(78, 0) NOT NULL,
                transaction_fee_eth  DOUBLE PRECISION,
                transaction_fee_usdt DOUBLE PRECISION,
                eth_usdt_price       DOUBLE PRECISION
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"CREATE INDEX IF NOT EXISTS idx_transactions_timestamp ON transactions (timestamp);"#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl TransactionStore for PgTransactionStore {
    async fn insert(&self, tx: &TxWithPrice) -> Result<(), StoreError> {
        let record = TransactionRecord::from_enriched(tx)?;

        sqlx::query(
            r#"
            INSERT INTO transactions (
                transaction_hash, block_number, timestamp, gas_used, gas_price_wei,
                transaction_fee_eth, transaction_fee_usdt, eth_usdt_price
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (transaction_hash) DO NOTHING;
            "#,
        )
        .bind(&record.transaction_hash)
        .bind(record.block_number)
        .bind(record.timestamp)
        .bind(record.gas_used)
        .bind(record.gas_price_wei)
        .bind(record.transaction_fee_eth)
        .bind(record.transaction_fee_usdt)
        .bind(record.eth_usdt_price)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn by_hash(&self, hash: &str) -> Result<TransactionRecord, StoreError> {
        let record = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT transaction_hash, block_number, timestamp, gas_used, gas_price_wei,
                   transaction_fee_eth, transaction_fee_usdt, eth_usdt_price
            FROM transactions
            WHERE transaction_hash = $1;
            "#,
        )
        .bind(hash)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or_else(|| StoreError::NotFound(hash.to_string()))
    }

    async fn latest(&self, limit: i64) -> Result<Vec<TransactionRecord>, StoreError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT transaction_hash, block_number, timestamp, gas_used, gas_price_wei,
                   transaction_fee_eth, transaction_fee_usdt, eth_usdt_price
            FROM transactions
            ORDER BY timestamp DESC
            LIMIT $1;
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    async fn by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let records = sqlx::query_as::<_, TransactionRecord>(
            r#"
            SELECT transaction_hash, block_number, timestamp, gas_used, gas_price_wei,
                   transaction_fee_eth, transaction_fee_usdt, eth_usdt_price
            FROM transactions
            WHERE timestamp >= $1 AND timestamp <= $2
            ORDER BY timestamp DESC;
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
