//! # Live Recorder
//!
//! Periodic incremental ingestion: every tick, compare the pool's current
//! head block against the last block already recorded and batch-process the
//! gap. The cancellation token stops the loop between ticks and also reaches
//! any in-flight batch through a child token.

use crate::errors::ClientError;
use crate::tx_manager::TransactionManagerTrait;
use crate::tx_store::TransactionStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const TICK_INTERVAL: Duration = Duration::from_secs(60);

pub struct LiveRecorder {
    last_block: u64,
    tx_manager: Arc<dyn TransactionManagerTrait>,
    tx_store: Arc<dyn TransactionStore>,
    tick_interval: Duration,
}

impl LiveRecorder {
    /// Anchors the recorder at the pool's current head.
    pub async fn new(
        tx_manager: Arc<dyn TransactionManagerTrait>,
        tx_store: Arc<dyn TransactionStore>,
    ) -> Result<Self, ClientError> {
        let last_block = tx_manager.latest_block_number().await?;
        info!(target: "live_recorder", last_block, "anchored at current head");
        Ok(Self {
            last_block,
            tx_manager,
            tx_store,
            tick_interval: TICK_INTERVAL,
        })
    }

    /// Overrides the tick cadence; tests shrink it to milliseconds.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// Runs until the token is cancelled. The first tick fires one interval
    /// after startup.
    pub async fn run(mut self, ctx: CancellationToken) {
        let start = tokio::time::Instant::now() + self.tick_interval;
        let mut ticker = tokio::time::interval_at(start, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(target: "live_recorder", "started");
        loop {
            tokio::select! {
                biased;
                _ = ctx.cancelled() => {
                    info!(target: "live_recorder", "shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    self.record_new_transactions(&ctx).await;
                }
            }
        }
    }

    async fn record_new_transactions(&mut self, ctx: &CancellationToken) {
        let latest = match self.tx_manager.latest_block_number().await {
            Ok(latest) => latest,
            Err(e) => {
                error!(target: "live_recorder", error = %e, "failed to fetch latest block number");
                return;
            }
        };

        if latest <= self.last_block {
            info!(target: "live_recorder", head = latest, "no new blocks");
            return;
        }

        let start_block = self.last_block + 1;
        let transactions = match self
            .tx_manager
            .batch_process(start_block, latest, ctx.child_token())
            .await
        {
            Ok(transactions) => transactions,
            Err(e) => {
                error!(
                    target: "live_recorder",
                    start_block,
                    end_block = latest,
                    error = %e,
                    "failed to process new blocks"
                );
                return;
            }
        };

        let mut inserted = 0usize;
        for tx in &transactions {
            if let Err(e) = self.tx_store.insert(tx).await {
                warn!(target: "live_recorder", hash = %tx.data.hash, error = %e, "failed to persist transaction, skipping");
                continue;
            }
            inserted += 1;
        }

        self.last_block = latest;
        info!(
            target: "live_recorder",
            up_to_block = latest,
            fetched = transactions.len(),
            inserted,
            "recorded new transactions"
        );
    }
}
