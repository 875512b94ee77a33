//! # Batch Processor
//!
//! Drives one backfill job from `running` to a terminal state: runs the batch
//! engine under a deadline, streams each enriched transaction into the
//! durable store, and records the outcome on the job record. Per-record
//! insert failures are logged and skipped; only engine-level failures fail
//! the job.

use crate::cache::JobStore;
use crate::errors::BatchError;
use crate::tx_manager::TransactionManagerTrait;
use crate::tx_store::TransactionStore;
use crate::types::{BatchJob, JobStatus};
use crate::utils::unix_to_datetime;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Wall-clock budget for a single batch job.
const JOB_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// The processing seam consumed by the API layer's background spawn.
#[async_trait]
pub trait BatchProcessor: Send + Sync + std::fmt::Debug {
    async fn process_job(
        &self,
        job_id: Uuid,
        start_time: i64,
        end_time: i64,
    ) -> Result<(), BatchError>;
}

#[derive(Clone)]
pub struct BatchProcessorImpl {
    tx_store: Arc<dyn TransactionStore>,
    job_store: Arc<dyn JobStore>,
    tx_manager: Arc<dyn TransactionManagerTrait>,
    job_timeout: Duration,
}

impl std::fmt::Debug for BatchProcessorImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessorImpl")
            .field("job_timeout", &self.job_timeout)
            .finish_non_exhaustive()
    }
}

impl BatchProcessorImpl {
    pub fn new(
        tx_store: Arc<dyn TransactionStore>,
        job_store: Arc<dyn JobStore>,
        tx_manager: Arc<dyn TransactionManagerTrait>,
    ) -> Self {
        Self {
            tx_store,
            job_store,
            tx_manager,
            job_timeout: JOB_TIMEOUT,
        }
    }

    /// Overrides the job deadline; tests shrink it to milliseconds.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = timeout;
        self
    }

    /// Read-modify-write of the job record: status, result message and
    /// `updated_at`.
    async fn update_job_status(
        &self,
        job_id: Uuid,
        status: JobStatus,
        result: &str,
    ) -> Result<(), BatchError> {
        let id = job_id.to_string();
        let data = self.job_store.get_job(&id).await?;
        let mut job = BatchJob::from_bytes(&data).map_err(|e| BatchError::JobDecode(e.to_string()))?;

        job.status = status;
        job.updated_at = Utc::now().timestamp();
        if !result.is_empty() {
            job.result = result.to_string();
        }

        let updated = job
            .to_bytes()
            .map_err(|e| BatchError::JobDecode(e.to_string()))?;
        self.job_store.set_job(&id, &updated).await?;
        Ok(())
    }
}

#[async_trait]
impl BatchProcessor for BatchProcessorImpl {
    async fn process_job(
        &self,
        job_id: Uuid,
        start_time: i64,
        end_time: i64,
    ) -> Result<(), BatchError> {
        self.update_job_status(job_id, JobStatus::Running, "").await?;

        // The deadline is delivered as cancellation so it propagates into the
        // engine's dispatcher, workers and limiter waits.
        let ctx = CancellationToken::new();
        let deadline = tokio::spawn({
            let ctx = ctx.clone();
            let timeout = self.job_timeout;
            async move {
                tokio::time::sleep(timeout).await;
                ctx.cancel();
            }
        });

        let outcome = self
            .tx_manager
            .batch_process_by_timestamp(
                unix_to_datetime(start_time),
                unix_to_datetime(end_time),
                ctx.clone(),
            )
            .await;
        deadline.abort();

        let transactions = match outcome {
            Ok(transactions) => transactions,
            Err(e) => {
                // The only canceller of this token is the deadline task.
                let e = match e {
                    BatchError::Cancelled => BatchError::DeadlineExceeded,
                    other => other,
                };
                error!(target: "batch_processor", %job_id, error = %e, "batch job failed");
                self.update_job_status(job_id, JobStatus::Failed, &e.to_string())
                    .await?;
                return Err(e);
            }
        };

        let mut inserted = 0usize;
        for tx in &transactions {
            if let Err(e) = self.tx_store.insert(tx).await {
                warn!(target: "batch_processor", %job_id, hash = %tx.data.hash, error = %e, "failed to persist transaction, skipping");
                continue;
            }
            inserted += 1;
        }

        info!(
            target: "batch_processor",
            %job_id,
            fetched = transactions.len(),
            inserted,
            "batch job complete"
        );
        self.update_job_status(
            job_id,
            JobStatus::Completed,
            "Batch job completed successfully.",
        )
        .await?;

        Ok(())
    }
}
