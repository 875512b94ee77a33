//! Ordered-set cache of observed ETH/USDT rates.
//!
//! Rates live in a single sorted set scored by unix seconds. A lookup scans
//! `[ts − W, ts + W]` and returns the earliest member in range, which makes
//! ties deterministic. The whole namespace expires a fixed interval after the
//! last write, so a quiet tracker sheds the set on its own.

use crate::cache::{RateStore, RedisCache};
use crate::errors::CacheError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;

const SORTED_SET_KEY: &str = "rate_cache";
/// Namespace TTL, refreshed on every store.
const TTL_SECS: i64 = 300;
/// Half-width of the lookup window around the requested timestamp.
const LOOKUP_WINDOW_SECS: i64 = 300;

#[derive(Debug, Clone)]
pub struct RedisRateCache {
    cache: RedisCache,
}

impl RedisRateCache {
    pub fn new(cache: RedisCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl RateStore for RedisRateCache {
    async fn store_rate(&self, ts: DateTime<Utc>, rate: f64) -> Result<(), CacheError> {
        let mut conn = self.cache.connection();
        let score = ts.timestamp();

        conn.zadd::<_, _, _, ()>(SORTED_SET_KEY, rate, score).await?;
        // Keep the set alive as long as rates keep flowing in.
        conn.expire::<_, ()>(SORTED_SET_KEY, TTL_SECS).await?;
        Ok(())
    }

    async fn get_rate(&self, ts: DateTime<Utc>) -> Result<f64, CacheError> {
        let mut conn = self.cache.connection();
        let target = ts.timestamp();
        let min = target - LOOKUP_WINDOW_SECS;
        let max = target + LOOKUP_WINDOW_SECS;

        // ZRANGEBYSCORE walks ascending scores, so the first member is the
        // earliest observation inside the window.
        let members: Vec<String> = conn
            .zrangebyscore_limit(SORTED_SET_KEY, min, max, 0, 1)
            .await?;

        let member = members
            .into_iter()
            .next()
            .ok_or(CacheError::RateNotFound(target))?;

        member
            .parse::<f64>()
            .map_err(|e| CacheError::Decode(format!("rate member '{member}': {e}")))
    }
}
