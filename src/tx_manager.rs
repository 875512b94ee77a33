//! # Transaction Manager
//!
//! Owns the enrichment math and the concurrent batch fan-out engine.
//!
//! The engine's shape for one batch invocation: a dispatcher feeds
//! monotonically increasing page numbers into a bounded channel; a fixed pool
//! of workers pulls pages, fetches the corresponding transfer listing,
//! deduplicates by hash against a shared set, enriches each transaction with
//! a price lookup, and forwards results over a back-pressured channel to the
//! collector. A shared stop token — cancelled at most once, observable by
//! everyone — ends paging when a short page or the provider's end-of-pages
//! sentinel shows the range is exhausted. The caller's cancellation token is
//! honored at every suspension point.
//!
//! Output is an unordered bag; deduplication by hash is the only cross-page
//! guarantee.

use crate::client::{BlockSide, TransactionClient};
use crate::errors::{BatchError, ClientError, PriceError, TrackerError};
use crate::price_manager::PriceSource;
use crate::types::{TransactionData, TxWithPrice};
use crate::utils::wei_to_eth;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pagination unit of the upstream listing API.
pub const PAGE_SIZE: usize = 100;
/// Fixed worker-pool width per batch invocation.
pub const NUM_WORKERS: usize = 10;
/// Bound of the dispatcher→worker page channel.
const PAGE_CHANNEL_CAPACITY: usize = NUM_WORKERS;

/// Manager operations consumed by the batch processor, the live recorder and
/// the API layer.
#[async_trait]
pub trait TransactionManagerTrait: Send + Sync + std::fmt::Debug {
    /// Block number of the most recent swap on the pool.
    async fn latest_block_number(&self) -> Result<u64, ClientError>;

    /// Fetches a single transaction by hash and enriches it.
    async fn get_transaction(&self, hash: &str) -> Result<TxWithPrice, TrackerError>;

    /// Concurrently fetches and enriches every distinct swap whose block lies
    /// in `[start_block, end_block]`.
    async fn batch_process(
        &self,
        start_block: u64,
        end_block: u64,
        ctx: CancellationToken,
    ) -> Result<Vec<TxWithPrice>, BatchError>;

    /// Resolves the inclusive-interior block bracket for `[start, end]` and
    /// delegates to [`Self::batch_process`].
    async fn batch_process_by_timestamp(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ctx: CancellationToken,
    ) -> Result<Vec<TxWithPrice>, BatchError>;
}

#[derive(Clone)]
pub struct TransactionManager {
    tx_client: Arc<dyn TransactionClient>,
    price_source: Arc<dyn PriceSource>,
}

impl std::fmt::Debug for TransactionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionManager").finish_non_exhaustive()
    }
}

/// Fee computation: `fee_eth = gas_price_wei × 10⁻¹⁸ × gas_used`,
/// `fee_usdt = fee_eth × rate`.
fn compute_fees(tx: &TransactionData, rate: f64) -> (f64, f64) {
    let fee_eth = wei_to_eth(tx.gas_price_wei) * tx.gas_used as f64;
    let fee_usdt = fee_eth * rate;
    (fee_eth, fee_usdt)
}

impl TransactionManager {
    pub fn new(tx_client: Arc<dyn TransactionClient>, price_source: Arc<dyn PriceSource>) -> Self {
        Self {
            tx_client,
            price_source,
        }
    }

    /// Looks up the rate at the transaction's timestamp and computes both fees.
    async fn enrich(&self, tx: TransactionData) -> Result<TxWithPrice, PriceError> {
        let rate = self.price_source.get_eth_usdt(tx.timestamp).await?;
        let (fee_eth, fee_usdt) = compute_fees(&tx, rate);
        Ok(TxWithPrice {
            data: tx,
            eth_usdt_price: rate,
            fee_eth,
            fee_usdt,
        })
    }

    /// One page-worker: pull a page number, list the page, dedup, enrich,
    /// forward. Ends on stop, cancellation, or page-channel close.
    async fn page_worker(
        self,
        worker_id: usize,
        start_block: u64,
        end_block: u64,
        pages_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<usize>>>,
        results_tx: mpsc::Sender<TxWithPrice>,
        seen: Arc<Mutex<HashSet<String>>>,
        stop: CancellationToken,
        ctx: CancellationToken,
    ) {
        loop {
            let page = tokio::select! {
                biased;
                _ = ctx.cancelled() => break,
                _ = stop.cancelled() => break,
                page = async { pages_rx.lock().await.recv().await } => match page {
                    Some(page) => page,
                    None => break,
                },
            };

            let transfers = match self
                .tx_client
                .list_transfers(PAGE_SIZE, Some(start_block), Some(end_block), page)
                .await
            {
                Ok(transfers) => transfers,
                Err(e) if e.is_end_of_pages() => {
                    debug!(target: "batch_engine", worker_id, page, "end of pages");
                    stop.cancel();
                    continue;
                }
                Err(e) => {
                    // A failed page contributes nothing but does not tear the
                    // job down.
                    warn!(target: "batch_engine", worker_id, page, error = %e, "page fetch failed, skipping");
                    continue;
                }
            };

            let last_page = transfers.len() < PAGE_SIZE;

            for tx in transfers {
                {
                    let mut seen = seen.lock().unwrap();
                    if !seen.insert(tx.hash.clone()) {
                        continue;
                    }
                }

                let enriched = match self.enrich(tx).await {
                    Ok(enriched) => enriched,
                    Err(e) => {
                        warn!(target: "batch_engine", worker_id, error = %e, "enrichment failed, skipping transaction");
                        continue;
                    }
                };

                tokio::select! {
                    biased;
                    _ = ctx.cancelled() => return,
                    sent = results_tx.send(enriched) => {
                        if sent.is_err() {
                            return;
                        }
                    }
                }
            }

            if last_page {
                debug!(target: "batch_engine", worker_id, page, "short page, stopping dispatch");
                stop.cancel();
            }
        }
    }
}

#[async_trait]
impl TransactionManagerTrait for TransactionManager {
    async fn latest_block_number(&self) -> Result<u64, ClientError> {
        Ok(self.tx_client.get_latest_swap().await?.block_number)
    }

    async fn get_transaction(&self, hash: &str) -> Result<TxWithPrice, TrackerError> {
        let tx = self.tx_client.get_receipt(hash).await?;
        Ok(self.enrich(tx).await?)
    }

    async fn batch_process(
        &self,
        start_block: u64,
        end_block: u64,
        ctx: CancellationToken,
    ) -> Result<Vec<TxWithPrice>, BatchError> {
        let (pages_tx, pages_rx) = mpsc::channel::<usize>(PAGE_CHANNEL_CAPACITY);
        let pages_rx = Arc::new(tokio::sync::Mutex::new(pages_rx));
        // Capacity-1 results channel: workers are back-pressured whenever the
        // collector stalls.
        let (results_tx, mut results_rx) = mpsc::channel::<TxWithPrice>(1);

        let stop = CancellationToken::new();
        let seen: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));

        let mut workers = Vec::with_capacity(NUM_WORKERS);
        for worker_id in 0..NUM_WORKERS {
            workers.push(tokio::spawn(self.clone().page_worker(
                worker_id,
                start_block,
                end_block,
                Arc::clone(&pages_rx),
                results_tx.clone(),
                Arc::clone(&seen),
                stop.clone(),
                ctx.clone(),
            )));
        }
        // Only workers hold result senders from here on; the channel closes
        // when the last worker exits.
        drop(results_tx);

        let dispatcher = tokio::spawn({
            let stop = stop.clone();
            let ctx = ctx.clone();
            async move {
                let mut page = 1usize;
                loop {
                    tokio::select! {
                        biased;
                        _ = ctx.cancelled() => break,
                        _ = stop.cancelled() => break,
                        permit = pages_tx.reserve() => match permit {
                            Ok(permit) => {
                                permit.send(page);
                                page += 1;
                            }
                            Err(_) => break,
                        },
                    }
                }
            }
        });

        let mut transactions = Vec::new();
        while let Some(tx) = results_rx.recv().await {
            transactions.push(tx);
        }

        join_all(workers).await;
        let _ = dispatcher.await;

        if ctx.is_cancelled() {
            // Results delivered before cancellation were valid, but the run
            // itself did not cover the requested range.
            return Err(BatchError::Cancelled);
        }

        info!(
            target: "batch_engine",
            start_block,
            end_block,
            count = transactions.len(),
            "batch processing complete"
        );
        Ok(transactions)
    }

    async fn batch_process_by_timestamp(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        ctx: CancellationToken,
    ) -> Result<Vec<TxWithPrice>, BatchError> {
        // Inclusive-interior bracket: first block after the start, last block
        // before the end.
        let start_block = self
            .tx_client
            .block_by_time(start, BlockSide::After)
            .await
            .map_err(BatchError::BlockResolution)?;

        let end_block = self
            .tx_client
            .block_by_time(end, BlockSide::Before)
            .await
            .map_err(BatchError::BlockResolution)?;

        self.batch_process(start_block, end_block, ctx).await
    }
}
