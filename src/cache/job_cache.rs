//! Batch-job record store.
//!
//! Job records are opaque JSON bytes under `batch_job:<id>`, each write
//! resetting a 30-minute TTL so finished jobs age out without a sweeper.

use crate::cache::{JobStore, RedisCache};
use crate::errors::CacheError;
use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

const KEY_PREFIX: &str = "batch_job:";
const TTL_SECS: u64 = 30 * 60;

#[derive(Debug, Clone)]
pub struct RedisJobCache {
    cache: RedisCache,
}

impl RedisJobCache {
    pub fn new(cache: RedisCache) -> Self {
        Self { cache }
    }

    fn key(id: &str) -> String {
        format!("{KEY_PREFIX}{id}")
    }
}

#[async_trait]
impl JobStore for RedisJobCache {
    async fn set_job(&self, id: &str, data: &[u8]) -> Result<(), CacheError> {
        let mut conn = self.cache.connection();
        conn.set_ex::<_, _, ()>(Self::key(id), data, TTL_SECS).await?;
        Ok(())
    }

    async fn get_job(&self, id: &str) -> Result<Vec<u8>, CacheError> {
        let mut conn = self.cache.connection();
        let data: Option<Vec<u8>> = conn.get(Self::key(id)).await?;
        data.ok_or_else(|| CacheError::JobNotFound(id.to_string()))
    }

    async fn all_jobs(&self) -> Result<Vec<Vec<u8>>, CacheError> {
        let mut scan_conn = self.cache.connection();

        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter = scan_conn
                .scan_match::<_, String>(format!("{KEY_PREFIX}*"))
                .await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }

        if keys.is_empty() {
            return Ok(Vec::new());
        }

        // Entries may expire between SCAN and MGET; missing values are simply
        // dropped.
        let mut conn = self.cache.connection();
        let values: Vec<Option<Vec<u8>>> = conn.mget(&keys).await?;
        let jobs: Vec<Vec<u8>> = values.into_iter().flatten().collect();
        debug!(target: "job_cache", count = jobs.len(), "scanned job records");
        Ok(jobs)
    }
}
