//! # HTTP API
//!
//! Axum router for the tracker's public surface, mounted under `/api/v1`.
//! Handlers are thin: parameter validation, store/processor calls, status
//! mapping. The router is a pure function over [`AppState`] so tests can
//! stand it up against mock stores.

use crate::batch_processor::BatchProcessor;
use crate::cache::JobStore;
use crate::tx_store::TransactionStore;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

pub mod batch_jobs;
pub mod transactions;

/// Shared handler dependencies.
#[derive(Clone)]
pub struct AppState {
    pub tx_store: Arc<dyn TransactionStore>,
    pub job_store: Arc<dyn JobStore>,
    pub processor: Arc<dyn BatchProcessor>,
}

/// JSON error body used by every handler.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// Builds the application router.
pub fn app_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route(
            "/batch-jobs",
            post(batch_jobs::create_batch_job).get(batch_jobs::list_batch_jobs),
        )
        .route("/batch-jobs/:id", get(batch_jobs::get_batch_job))
        .route("/transactions", get(transactions::transactions_by_time_range))
        .route("/transactions/latest", get(transactions::latest_transactions))
        .route("/transactions/:hash", get(transactions::transaction_by_hash));

    Router::new().nest("/api/v1", v1).with_state(state)
}

/// Binds the listener and serves the API until the process exits.
pub async fn serve(port: &str, state: AppState) -> std::io::Result<()> {
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(target: "api", %addr, "HTTP server listening");
    axum::serve(listener, app_router(state)).await
}
