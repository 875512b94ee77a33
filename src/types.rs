//! Core domain types shared across the tracker: raw and enriched swap
//! transactions, and the batch-job record kept in the job store.

use chrono::{DateTime, Utc};
use ethers::types::U256;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A raw swap transaction as observed from the indexer. Immutable once observed.
///
/// Receipt lookups carry no timestamp on the wire, so `timestamp` may be the
/// unix epoch for receipt-sourced values; listing-sourced values always carry
/// the block timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionData {
    pub block_number: u64,
    /// `0x`-prefixed 32-byte transaction hash.
    pub hash: String,
    pub gas_used: u64,
    /// Effective gas price in wei. Kept arbitrary-precision; wei amounts do
    /// not reliably fit a machine word.
    pub gas_price_wei: U256,
    /// Block timestamp, second precision.
    pub timestamp: DateTime<Utc>,
}

/// A swap transaction enriched with the ETH/USDT rate at its timestamp and the
/// computed fees.
///
/// Invariants: `fee_eth = gas_price_wei × 10⁻¹⁸ × gas_used`,
/// `fee_usdt = fee_eth × eth_usdt_price`, `eth_usdt_price > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct TxWithPrice {
    pub data: TransactionData,
    pub eth_usdt_price: f64,
    pub fee_eth: f64,
    pub fee_usdt: f64,
}

/// Lifecycle states of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A historical-backfill job record, persisted as JSON in the job store under
/// `batch_job:<id>` with a 30-minute TTL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchJob {
    pub id: Uuid,
    pub status: JobStatus,
    /// Start of the backfill window, unix seconds.
    pub start_time: i64,
    /// End of the backfill window, unix seconds. Must exceed `start_time` by
    /// at most one week.
    pub end_time: i64,
    pub created_at: i64,
    pub updated_at: i64,
    /// Opaque status message set on completion or failure.
    pub result: String,
}

impl BatchJob {
    /// Creates a fresh `pending` job for the given window.
    pub fn new(start_time: i64, end_time: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            start_time,
            end_time,
            created_at: now,
            updated_at: now,
            result: String::new(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}
