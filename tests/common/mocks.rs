//! Hand-written mock implementations of the tracker's injection seams.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{ErrorKind, RedisError};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use uniswap_fee_tracker::cache::{JobStore, RateStore};
use uniswap_fee_tracker::client::{BlockSide, KlineData, PriceClient, TransactionClient};
use uniswap_fee_tracker::errors::{
    BatchError, CacheError, ClientError, PriceError, StoreError, TrackerError,
};
use uniswap_fee_tracker::price_manager::PriceSource;
use uniswap_fee_tracker::tx_manager::TransactionManagerTrait;
use uniswap_fee_tracker::tx_store::{TransactionRecord, TransactionStore};
use uniswap_fee_tracker::types::{BatchJob, JobStatus, TransactionData, TxWithPrice};

fn mock_redis_error() -> RedisError {
    RedisError::from((ErrorKind::IoError, "mock cache down"))
}

// === Transaction client ===

/// Serves a fixed transfer list in pages, with switchable failure modes, and
/// records every page number requested so tests can spy on pagination.
#[derive(Debug, Default)]
pub struct MockTransactionClient {
    pub transfers: Vec<TransactionData>,
    pub latest: Option<TransactionData>,
    /// Pages at or beyond this number answer with the end-of-pages sentinel.
    pub end_of_pages_from: Option<usize>,
    /// Pages that fail with a transient upstream error.
    pub fail_pages: HashSet<usize>,
    /// When set, every page is full of fresh unique hashes (never terminates
    /// on its own).
    pub infinite_pages: bool,
    pub page_delay: Option<Duration>,
    pub block_after: u64,
    pub block_before: u64,
    pub requested_pages: Mutex<Vec<usize>>,
}

impl MockTransactionClient {
    pub fn with_transfers(transfers: Vec<TransactionData>) -> Self {
        Self {
            transfers,
            ..Default::default()
        }
    }

    pub fn max_requested_page(&self) -> usize {
        self.requested_pages
            .lock()
            .unwrap()
            .iter()
            .copied()
            .max()
            .unwrap_or(0)
    }
}

#[async_trait]
impl TransactionClient for MockTransactionClient {
    async fn get_receipt(&self, hash: &str) -> Result<TransactionData, ClientError> {
        self.transfers
            .iter()
            .find(|tx| tx.hash == hash)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(hash.to_string()))
    }

    async fn get_latest_swap(&self) -> Result<TransactionData, ClientError> {
        self.latest
            .clone()
            .or_else(|| self.transfers.first().cloned())
            .ok_or_else(|| ClientError::NotFound("latest pool transaction".into()))
    }

    async fn list_transfers(
        &self,
        batch_size: usize,
        _start_block: Option<u64>,
        _end_block: Option<u64>,
        page: usize,
    ) -> Result<Vec<TransactionData>, ClientError> {
        self.requested_pages.lock().unwrap().push(page);

        if let Some(delay) = self.page_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_pages.contains(&page) {
            return Err(ClientError::TransientUpstream(format!("page {page} broke")));
        }
        if let Some(from) = self.end_of_pages_from {
            if page >= from {
                return Err(ClientError::EndOfPages);
            }
        }

        if self.infinite_pages {
            return Ok((0..batch_size as u64)
                .map(|i| super::tx_data(page as u64 * 1_000_000 + i, 0))
                .collect());
        }

        let start = (page - 1) * batch_size;
        if start >= self.transfers.len() {
            return Ok(Vec::new());
        }
        let end = (start + batch_size).min(self.transfers.len());
        Ok(self.transfers[start..end].to_vec())
    }

    async fn block_by_time(
        &self,
        _ts: DateTime<Utc>,
        side: BlockSide,
    ) -> Result<u64, ClientError> {
        Ok(match side {
            BlockSide::After => self.block_after,
            BlockSide::Before => self.block_before,
        })
    }
}

// === Price tier mocks ===

/// Fixed-rate price source; failures are keyed by unix timestamp.
#[derive(Debug)]
pub struct MockPriceSource {
    pub rate: f64,
    pub fail_for_ts: HashSet<i64>,
    pub calls: AtomicU32,
}

impl MockPriceSource {
    pub fn fixed(rate: f64) -> Self {
        Self {
            rate,
            fail_for_ts: HashSet::new(),
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn get_eth_usdt(&self, ts: DateTime<Utc>) -> Result<f64, PriceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_for_ts.contains(&ts.timestamp()) {
            return Err(PriceError::Origin(ClientError::InvalidTimestamp(
                "mock refusal".into(),
            )));
        }
        Ok(self.rate)
    }
}

/// Origin-API mock for price-manager tests; counts calls.
#[derive(Debug)]
pub struct MockPriceClient {
    pub rate: f64,
    pub calls: AtomicU32,
}

impl MockPriceClient {
    pub fn fixed(rate: f64) -> Self {
        Self {
            rate,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl PriceClient for MockPriceClient {
    async fn get_eth_usdt(&self, ts: DateTime<Utc>) -> Result<KlineData, ClientError> {
        if ts.timestamp() == 0 {
            return Err(ClientError::InvalidTimestamp(
                "candle timestamp must be non-zero".into(),
            ));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(KlineData {
            close_price: self.rate,
        })
    }
}

/// In-memory stand-in for the Redis rate cache, honoring the same ±300 s
/// lookup window and earliest-in-range tie-break.
#[derive(Debug, Default)]
pub struct InMemoryRateStore {
    pub rates: Mutex<BTreeMap<i64, f64>>,
    pub fail_stores: AtomicBool,
    pub store_calls: AtomicU32,
    pub get_calls: AtomicU32,
}

const LOOKUP_WINDOW_SECS: i64 = 300;

#[async_trait]
impl RateStore for InMemoryRateStore {
    async fn store_rate(&self, ts: DateTime<Utc>, rate: f64) -> Result<(), CacheError> {
        self.store_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stores.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable(mock_redis_error()));
        }
        self.rates.lock().unwrap().insert(ts.timestamp(), rate);
        Ok(())
    }

    async fn get_rate(&self, ts: DateTime<Utc>) -> Result<f64, CacheError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let target = ts.timestamp();
        let rates = self.rates.lock().unwrap();
        rates
            .range(target - LOOKUP_WINDOW_SECS..=target + LOOKUP_WINDOW_SECS)
            .next()
            .map(|(_, rate)| *rate)
            .ok_or(CacheError::RateNotFound(target))
    }
}

// === Job store ===

/// In-memory job store that also records every status transition it sees.
#[derive(Debug, Default)]
pub struct MockJobStore {
    pub jobs: Mutex<HashMap<String, Vec<u8>>>,
    pub status_history: Mutex<Vec<(String, JobStatus)>>,
    pub fail_all: AtomicBool,
}

impl MockJobStore {
    pub fn seeded_with(job: &BatchJob) -> Self {
        let store = Self::default();
        store
            .jobs
            .lock()
            .unwrap()
            .insert(job.id.to_string(), job.to_bytes().unwrap());
        store
    }

    pub fn job(&self, id: &str) -> Option<BatchJob> {
        let jobs = self.jobs.lock().unwrap();
        jobs.get(id).and_then(|data| BatchJob::from_bytes(data).ok())
    }

    pub fn statuses(&self, id: &str) -> Vec<JobStatus> {
        self.status_history
            .lock()
            .unwrap()
            .iter()
            .filter(|(job_id, _)| job_id == id)
            .map(|(_, status)| *status)
            .collect()
    }
}

#[async_trait]
impl JobStore for MockJobStore {
    async fn set_job(&self, id: &str, data: &[u8]) -> Result<(), CacheError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable(mock_redis_error()));
        }
        if let Ok(job) = BatchJob::from_bytes(data) {
            self.status_history
                .lock()
                .unwrap()
                .push((id.to_string(), job.status));
        }
        self.jobs.lock().unwrap().insert(id.to_string(), data.to_vec());
        Ok(())
    }

    async fn get_job(&self, id: &str) -> Result<Vec<u8>, CacheError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable(mock_redis_error()));
        }
        let jobs = self.jobs.lock().unwrap();
        jobs.get(id)
            .cloned()
            .ok_or_else(|| CacheError::JobNotFound(id.to_string()))
    }

    async fn all_jobs(&self) -> Result<Vec<Vec<u8>>, CacheError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable(mock_redis_error()));
        }
        Ok(self.jobs.lock().unwrap().values().cloned().collect())
    }
}

// === Transaction store ===

#[derive(Debug, Default)]
pub struct MockTransactionStore {
    pub records: Mutex<Vec<TxWithPrice>>,
    /// Hashes whose insert fails.
    pub fail_hashes: HashSet<String>,
}

impl MockTransactionStore {
    pub fn seeded_with(records: Vec<TxWithPrice>) -> Self {
        Self {
            records: Mutex::new(records),
            fail_hashes: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl TransactionStore for MockTransactionStore {
    async fn insert(&self, tx: &TxWithPrice) -> Result<(), StoreError> {
        if self.fail_hashes.contains(&tx.data.hash) {
            return Err(StoreError::InvalidRecord("mock insert failure".into()));
        }
        let mut records = self.records.lock().unwrap();
        if !records.iter().any(|r| r.data.hash == tx.data.hash) {
            records.push(tx.clone());
        }
        Ok(())
    }

    async fn by_hash(&self, hash: &str) -> Result<TransactionRecord, StoreError> {
        let records = self.records.lock().unwrap();
        let tx = records
            .iter()
            .find(|r| r.data.hash == hash)
            .ok_or_else(|| StoreError::NotFound(hash.to_string()))?;
        TransactionRecord::from_enriched(tx)
    }

    async fn latest(&self, limit: i64) -> Result<Vec<TransactionRecord>, StoreError> {
        let records = self.records.lock().unwrap();
        let mut sorted: Vec<&TxWithPrice> = records.iter().collect();
        sorted.sort_by_key(|r| std::cmp::Reverse(r.data.timestamp));
        sorted
            .into_iter()
            .take(limit.max(0) as usize)
            .map(TransactionRecord::from_enriched)
            .collect()
    }

    async fn by_time_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>, StoreError> {
        let records = self.records.lock().unwrap();
        records
            .iter()
            .filter(|r| r.data.timestamp >= start && r.data.timestamp <= end)
            .map(TransactionRecord::from_enriched)
            .collect()
    }
}

// === Transaction manager ===

/// Canned batch results with optional latency; honors cancellation while
/// sleeping, like the real engine.
#[derive(Debug)]
pub struct MockTransactionManager {
    pub latest_block: AtomicU64,
    pub transactions: Vec<TxWithPrice>,
    pub delay: Option<Duration>,
    pub fail: bool,
    pub batch_calls: Mutex<Vec<(u64, u64)>>,
}

impl MockTransactionManager {
    pub fn with_transactions(transactions: Vec<TxWithPrice>) -> Self {
        Self {
            latest_block: AtomicU64::new(0),
            transactions,
            delay: None,
            fail: false,
            batch_calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TransactionManagerTrait for MockTransactionManager {
    async fn latest_block_number(&self) -> Result<u64, ClientError> {
        Ok(self.latest_block.load(Ordering::SeqCst))
    }

    async fn get_transaction(&self, hash: &str) -> Result<TxWithPrice, TrackerError> {
        self.transactions
            .iter()
            .find(|tx| tx.data.hash == hash)
            .cloned()
            .ok_or_else(|| TrackerError::Client(ClientError::NotFound(hash.to_string())))
    }

    async fn batch_process(
        &self,
        start_block: u64,
        end_block: u64,
        ctx: CancellationToken,
    ) -> Result<Vec<TxWithPrice>, BatchError> {
        self.batch_calls.lock().unwrap().push((start_block, end_block));

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = ctx.cancelled() => return Err(BatchError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if self.fail {
            return Err(BatchError::BlockResolution(ClientError::NotFound(
                "mock block lookup".into(),
            )));
        }
        Ok(self.transactions.clone())
    }

    async fn batch_process_by_timestamp(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ctx: CancellationToken,
    ) -> Result<Vec<TxWithPrice>, BatchError> {
        self.batch_process(start.timestamp() as u64, end.timestamp() as u64, ctx)
            .await
    }
}

/// Convenience: a pending job plus a seeded store holding it.
pub fn pending_job(start_time: i64, end_time: i64) -> (BatchJob, MockJobStore) {
    let job = BatchJob::new(start_time, end_time);
    let store = MockJobStore::seeded_with(&job);
    (job, store)
}
