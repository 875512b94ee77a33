//! Uniswap V3 swap-fee tracker.
//!
//! Records the gas fee of every swap on the WETH/USDC pool in both ETH and
//! USDT, by combining an indexer API (transaction listings, receipts, block
//! lookups) with a market-data API (ETH/USDT candles) behind a tiered price
//! cache. Historical windows are backfilled by a concurrent batch engine;
//! a live recorder tails the pool's head block.

pub mod api;
pub mod batch_processor;
pub mod cache;
pub mod client;
pub mod config;
pub mod errors;
pub mod live_recorder;
pub mod price_manager;
pub mod rate_limiter;
pub mod tx_manager;
pub mod tx_store;
pub mod types;
pub mod utils;

pub use batch_processor::{BatchProcessor, BatchProcessorImpl};
pub use config::Config;
pub use errors::TrackerError;
pub use live_recorder::LiveRecorder;
pub use price_manager::{PriceManager, PriceSource};
pub use tx_manager::{TransactionManager, TransactionManagerTrait};
pub use types::{BatchJob, JobStatus, TransactionData, TxWithPrice};
