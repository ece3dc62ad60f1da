//! Queue, cleanup and scheduler handlers.
//!
//! These are the manual triggers for the jobs the scheduler otherwise runs
//! on its own timers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use launchpro_core::{CleanupReport, QueueOutcome, QueueStatus, SchedulerStatus};

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

pub async fn queue_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<QueueStatus>, ApiError> {
    state
        .queue()
        .status()
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Run one queue invocation. Returns once the claimed campaign (if any)
/// reaches ACTIVE or FAILED.
///
/// The invocation runs on its own task, so a client that disconnects does
/// not cancel a launch halfway through a stage.
pub async fn process_queue(
    State(state): State<Arc<AppState>>,
) -> Result<Json<QueueOutcome>, ApiError> {
    let queue = Arc::clone(state.queue());
    tokio::spawn(async move { queue.process().await })
        .await
        .map_err(|e| {
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Queue invocation aborted: {}", e),
            )
        })?
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

pub async fn run_cleanup(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CleanupReport>, ApiError> {
    state
        .cleanup()
        .run()
        .await
        .map(Json)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

pub async fn scheduler_status(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    Json(state.scheduler().status().await)
}
