//! # Centralized Error Handling
//!
//! This module defines a hierarchical, typed error system for the entire
//! tracker. Each subsystem gets its own `thiserror` enum; the top-level
//! `TrackerError` composes them so callers can bubble failures with `?`
//! without losing the originating subsystem.

use thiserror::Error;

/// The top-level error type, encapsulating all possible failures within the tracker.
#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("API client error: {0}")]
    Client(#[from] ClientError),
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("price error: {0}")]
    Price(#[from] PriceError),
    #[error("batch error: {0}")]
    Batch(#[from] BatchError),
}

/// Failures surfaced by the rate-limited HTTP layer and the external API clients.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status: {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("failed to decode response body: {0}")]
    Decode(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("no candle data returned after {0} attempts")]
    EmptyAfterRetries(u32),
    #[error("no more pages within the queried range")]
    EndOfPages,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transient upstream error: {0}")]
    TransientUpstream(String),
    #[error("permanent upstream error: {0}")]
    PermanentUpstream(String),
}

impl ClientError {
    /// True when a paged listing has been exhausted. Batch workers use this to
    /// request cooperative shutdown instead of treating it as a failure.
    pub fn is_end_of_pages(&self) -> bool {
        matches!(self, ClientError::EndOfPages)
    }
}

/// Failures from the Redis-backed rate cache and job store.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),
    #[error("no rate found within range of timestamp {0}")]
    RateNotFound(i64),
    #[error("job {0} not found")]
    JobNotFound(String),
    #[error("failed to decode cached value: {0}")]
    Decode(String),
}

/// Failures from the durable transaction store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("transaction {0} not found")]
    NotFound(String),
    #[error("record cannot be represented in the store: {0}")]
    InvalidRecord(String),
}

/// Failures while resolving an ETH/USDT conversion rate.
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("origin price lookup failed: {0}")]
    Origin(#[from] ClientError),
}

/// Failures of a batch run as a whole. Per-page and per-transaction errors are
/// logged and skipped inside the engine; only these end the run.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("failed to resolve block range: {0}")]
    BlockResolution(#[source] ClientError),
    #[error("batch cancelled")]
    Cancelled,
    #[error("batch deadline exceeded")]
    DeadlineExceeded,
    #[error("job store error: {0}")]
    Job(#[from] CacheError),
    #[error("failed to decode job record: {0}")]
    JobDecode(String),
}
