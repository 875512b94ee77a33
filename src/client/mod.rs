//! External API clients: a blockchain indexer for swap listings and receipts,
//! and a market-data API for ETH/USDT candles. The traits here are the
//! injection seams; everything above them (managers, processors) is written
//! against `Arc<dyn …>` so tests can substitute mocks.

use crate::errors::ClientError;
use crate::types::TransactionData;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod binance;
pub mod etherscan;

pub use binance::KlineClient;
pub use etherscan::EtherscanClient;

/// Which side of a timestamp the resolved block must fall on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockSide {
    /// Nearest finalized block at or before the timestamp.
    Before,
    /// Nearest finalized block at or after the timestamp.
    After,
}

impl BlockSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockSide::Before => "before",
            BlockSide::After => "after",
        }
    }
}

/// A single close-price candle, the return shape of [`PriceClient::get_eth_usdt`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KlineData {
    pub close_price: f64,
}

/// Typed access to the transaction indexer.
#[async_trait]
pub trait TransactionClient: Send + Sync + std::fmt::Debug {
    /// Fetches the gas fields of a single transaction by hash. The receipt
    /// carries no block timestamp; see [`TransactionData::timestamp`].
    async fn get_receipt(&self, hash: &str) -> Result<TransactionData, ClientError>;

    /// Fetches the most recent swap observed on the configured pool.
    async fn get_latest_swap(&self) -> Result<TransactionData, ClientError>;

    /// Paged token-transfer listing for the configured pool, sorted descending
    /// by block. Returns [`ClientError::EndOfPages`] when the queried range is
    /// exhausted.
    async fn list_transfers(
        &self,
        batch_size: usize,
        start_block: Option<u64>,
        end_block: Option<u64>,
        page: usize,
    ) -> Result<Vec<TransactionData>, ClientError>;

    /// Resolves the nearest finalized block on the given side of `ts`.
    async fn block_by_time(&self, ts: DateTime<Utc>, side: BlockSide)
        -> Result<u64, ClientError>;
}

/// Typed access to the market-data API.
#[async_trait]
pub trait PriceClient: Send + Sync + std::fmt::Debug {
    /// Fetches the ETH/USDT close price of the candle ending at `ts`.
    async fn get_eth_usdt(&self, ts: DateTime<Utc>) -> Result<KlineData, ClientError>;
}
