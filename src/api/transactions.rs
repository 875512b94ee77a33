//! Transaction query handlers: by hash, latest-N, and inclusive time range.

use crate::api::{error_response, AppState};
use crate::errors::StoreError;
use crate::utils::{parse_unix_time, sanitize_tx_hash, unix_to_datetime};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use tracing::error;

const DEFAULT_LATEST_LIMIT: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct LatestParams {
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TimeRangeParams {
    start: Option<String>,
    end: Option<String>,
}

/// `GET /api/v1/transactions/:hash`
pub async fn transaction_by_hash(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Response {
    let Some(hash) = sanitize_tx_hash(&hash) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid or missing transaction hash",
        );
    };

    match state.tx_store.by_hash(&hash).await {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(StoreError::NotFound(_)) => {
            error_response(StatusCode::NOT_FOUND, "Transaction not found")
        }
        Err(e) => {
            error!(target: "api", error = %e, "transaction lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// `GET /api/v1/transactions/latest?limit=`
pub async fn latest_transactions(
    State(state): State<AppState>,
    Query(params): Query<LatestParams>,
) -> Response {
    // Only positive integers override the default.
    let limit = params
        .limit
        .as_deref()
        .and_then(|l| l.parse::<i64>().ok())
        .filter(|l| *l > 0)
        .unwrap_or(DEFAULT_LATEST_LIMIT);

    match state.tx_store.latest(limit).await {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            error!(target: "api", error = %e, "latest transactions lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

/// `GET /api/v1/transactions?start=&end=`
pub async fn transactions_by_time_range(
    State(state): State<AppState>,
    Query(params): Query<TimeRangeParams>,
) -> Response {
    let (Some(start_raw), Some(end_raw)) = (params.start, params.end) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Start and end timestamps are required",
        );
    };

    let Ok(start) = parse_unix_time(&start_raw) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid start timestamp. Use Unix time in seconds.",
        );
    };
    let Ok(end) = parse_unix_time(&end_raw) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Invalid end timestamp. Use Unix time in seconds.",
        );
    };

    if end < start {
        return error_response(
            StatusCode::BAD_REQUEST,
            "End timestamp must be after start timestamp",
        );
    }

    match state
        .tx_store
        .by_time_range(unix_to_datetime(start), unix_to_datetime(end))
        .await
    {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(e) => {
            error!(target: "api", error = %e, "time range lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}
