//! Redis-backed shared state: the ETH/USDT rate cache and the batch-job
//! store. Both sit behind small traits so the managers and processors above
//! them never see a connection type.

use crate::errors::CacheError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;

pub mod job_cache;
pub mod rate_cache;

pub use job_cache::RedisJobCache;
pub use rate_cache::RedisRateCache;

/// Time-indexed store of observed ETH/USDT conversion rates.
#[async_trait]
pub trait RateStore: Send + Sync + std::fmt::Debug {
    /// Records a rate observation at `ts` and refreshes the namespace TTL.
    async fn store_rate(&self, ts: DateTime<Utc>, rate: f64) -> Result<(), CacheError>;

    /// Returns a rate observed within the lookup window around `ts`, or
    /// [`CacheError::RateNotFound`].
    async fn get_rate(&self, ts: DateTime<Utc>) -> Result<f64, CacheError>;
}

/// Keyed store of serialized batch-job records with TTL.
#[async_trait]
pub trait JobStore: Send + Sync + std::fmt::Debug {
    /// Writes a job record, resetting its TTL.
    async fn set_job(&self, id: &str, data: &[u8]) -> Result<(), CacheError>;

    /// Reads a job record, or [`CacheError::JobNotFound`].
    async fn get_job(&self, id: &str) -> Result<Vec<u8>, CacheError>;

    /// Best-effort scan of every live job record; unreadable entries are
    /// skipped.
    async fn all_jobs(&self) -> Result<Vec<Vec<u8>>, CacheError>;
}

/// Shared Redis connection handle. One instance per logical database.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connects and verifies the server is reachable with a PING.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let mut conn = ConnectionManager::new(client).await?;
        redis::cmd("PING").query_async::<_, String>(&mut conn).await?;
        Ok(Self { conn })
    }

    /// A cloned multiplexed connection for issuing commands.
    pub(crate) fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish_non_exhaustive()
    }
}
