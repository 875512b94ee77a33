//! Job-lifecycle tests for the batch processor.

mod common;

use common::enriched;
use common::mocks::{pending_job, MockJobStore, MockTransactionManager, MockTransactionStore};
use std::sync::Arc;
use std::time::Duration;
use uniswap_fee_tracker::batch_processor::{BatchProcessor, BatchProcessorImpl};
use uniswap_fee_tracker::errors::BatchError;
use uniswap_fee_tracker::types::JobStatus;
use uuid::Uuid;

fn sample_batch() -> Vec<uniswap_fee_tracker::types::TxWithPrice> {
    (0..3).map(|i| enriched(i, i as i64)).collect()
}

#[tokio::test]
async fn successful_job_walks_running_then_completed() {
    let (job, job_store) = pending_job(1_700_000_000, 1_700_003_600);
    let job_store = Arc::new(job_store);
    let tx_store = Arc::new(MockTransactionStore::default());
    let manager = Arc::new(MockTransactionManager::with_transactions(sample_batch()));

    let processor = BatchProcessorImpl::new(tx_store.clone(), job_store.clone(), manager);
    processor
        .process_job(job.id, job.start_time, job.end_time)
        .await
        .unwrap();

    let id = job.id.to_string();
    assert_eq!(
        job_store.statuses(&id),
        vec![JobStatus::Running, JobStatus::Completed]
    );

    let final_job = job_store.job(&id).unwrap();
    assert_eq!(final_job.status, JobStatus::Completed);
    assert_eq!(final_job.result, "Batch job completed successfully.");
    assert!(final_job.updated_at >= final_job.created_at);
    assert_eq!(tx_store.len(), 3);
}

#[tokio::test]
async fn insert_failures_are_skipped_and_do_not_fail_the_job() {
    let (job, job_store) = pending_job(1_700_000_000, 1_700_003_600);
    let job_store = Arc::new(job_store);

    let mut tx_store = MockTransactionStore::default();
    tx_store.fail_hashes.insert(enriched(1, 0).data.hash);
    let tx_store = Arc::new(tx_store);

    let manager = Arc::new(MockTransactionManager::with_transactions(sample_batch()));
    let processor = BatchProcessorImpl::new(tx_store.clone(), job_store.clone(), manager);
    processor
        .process_job(job.id, job.start_time, job.end_time)
        .await
        .unwrap();

    assert_eq!(tx_store.len(), 2);
    assert_eq!(
        job_store.job(&job.id.to_string()).unwrap().status,
        JobStatus::Completed
    );
}

#[tokio::test]
async fn engine_failure_marks_the_job_failed_with_the_error_message() {
    let (job, job_store) = pending_job(1_700_000_000, 1_700_003_600);
    let job_store = Arc::new(job_store);
    let tx_store = Arc::new(MockTransactionStore::default());

    let mut manager = MockTransactionManager::with_transactions(Vec::new());
    manager.fail = true;
    let processor = BatchProcessorImpl::new(tx_store, job_store.clone(), Arc::new(manager));

    let err = processor
        .process_job(job.id, job.start_time, job.end_time)
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::BlockResolution(_)));

    let final_job = job_store.job(&job.id.to_string()).unwrap();
    assert_eq!(final_job.status, JobStatus::Failed);
    assert!(final_job.result.contains("failed to resolve block range"));
}

#[tokio::test]
async fn deadline_expiry_fails_the_job_as_deadline_exceeded() {
    let (job, job_store) = pending_job(1_700_000_000, 1_700_003_600);
    let job_store = Arc::new(job_store);
    let tx_store = Arc::new(MockTransactionStore::default());

    let mut manager = MockTransactionManager::with_transactions(sample_batch());
    manager.delay = Some(Duration::from_millis(500));

    let processor = BatchProcessorImpl::new(tx_store.clone(), job_store.clone(), Arc::new(manager))
        .with_job_timeout(Duration::from_millis(50));

    let err = processor
        .process_job(job.id, job.start_time, job.end_time)
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::DeadlineExceeded));

    let final_job = job_store.job(&job.id.to_string()).unwrap();
    assert_eq!(final_job.status, JobStatus::Failed);
    assert_eq!(final_job.result, "batch deadline exceeded");
    assert_eq!(tx_store.len(), 0);
}

#[tokio::test]
async fn unknown_job_id_is_a_job_store_error() {
    let job_store = Arc::new(MockJobStore::default());
    let tx_store = Arc::new(MockTransactionStore::default());
    let manager = Arc::new(MockTransactionManager::with_transactions(Vec::new()));

    let processor = BatchProcessorImpl::new(tx_store, job_store, manager);
    let err = processor
        .process_job(Uuid::new_v4(), 0, 1)
        .await
        .unwrap_err();
    assert!(matches!(err, BatchError::Job(_)));
}
