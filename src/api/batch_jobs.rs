//! Batch-job handlers: create (and spawn) a backfill job, fetch one by id,
//! list with an optional status filter.

use crate::api::{error_response, AppState};
use crate::errors::CacheError;
use crate::types::BatchJob;
use crate::utils::parse_unix_time;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

/// Maximum backfill window: one week.
const MAX_WINDOW_SECS: i64 = 60 * 60 * 24 * 7;

#[derive(Debug, Deserialize)]
pub struct CreateBatchJobParams {
    start_time: Option<String>,
    end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListBatchJobsParams {
    status: Option<String>,
}

/// `POST /api/v1/batch-jobs?start_time=&end_time=`
pub async fn create_batch_job(
    State(state): State<AppState>,
    Query(params): Query<CreateBatchJobParams>,
) -> Response {
    let (Some(start_raw), Some(end_raw)) = (params.start_time, params.end_time) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Missing 'start_time' or 'end_time' query parameters",
        );
    };

    let Ok(start_time) = parse_unix_time(&start_raw) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid 'start_time' format. Must be Unix epoch time in seconds.",
        );
    };
    let Ok(end_time) = parse_unix_time(&end_raw) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid 'end_time' format. Must be Unix epoch time in seconds.",
        );
    };

    if end_time <= start_time {
        return error_response(StatusCode::BAD_REQUEST, "End time must be after start time");
    }
    if end_time - start_time > MAX_WINDOW_SECS {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Timestamp duration must be less than a week",
        );
    }

    let job = BatchJob::new(start_time, end_time);
    let Ok(data) = job.to_bytes() else {
        return error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to serialize batch job data",
        );
    };

    if state.job_store.set_job(&job.id.to_string(), &data).await.is_err() {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to store batch job");
    }

    // The job runs in the background; the handler answers immediately with
    // the pending record.
    let processor = state.processor.clone();
    let job_id = job.id;
    tokio::spawn(async move {
        if let Err(e) = processor.process_job(job_id, start_time, end_time).await {
            error!(target: "api", %job_id, error = %e, "background batch job failed");
        }
    });

    (StatusCode::CREATED, Json(job)).into_response()
}

/// `GET /api/v1/batch-jobs/:id`
pub async fn get_batch_job(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if Uuid::parse_str(&id).is_err() {
        return error_response(StatusCode::BAD_REQUEST, "Invalid batch job ID format");
    }

    let data = match state.job_store.get_job(&id).await {
        Ok(data) => data,
        Err(CacheError::JobNotFound(_)) => {
            return error_response(StatusCode::NOT_FOUND, "Batch job not found");
        }
        Err(_) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve batch job",
            );
        }
    };

    match BatchJob::from_bytes(&data) {
        Ok(job) => (StatusCode::OK, Json(job)).into_response(),
        Err(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to parse batch job data",
        ),
    }
}

/// `GET /api/v1/batch-jobs?status=`
pub async fn list_batch_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListBatchJobsParams>,
) -> Response {
    let all = match state.job_store.all_jobs().await {
        Ok(all) => all,
        Err(_) => {
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to retrieve batch jobs",
            );
        }
    };

    let jobs: Vec<BatchJob> = all
        .iter()
        // Malformed records are skipped rather than failing the listing.
        .filter_map(|data| BatchJob::from_bytes(data).ok())
        .filter(|job| match &params.status {
            Some(status) => job.status.as_str() == status,
            None => true,
        })
        .collect();

    (StatusCode::OK, Json(jobs)).into_response()
}
