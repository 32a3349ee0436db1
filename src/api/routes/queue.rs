//! Submission and queue endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use super::{error, submit_error, ApiError};
use crate::api::ApiState;
use crate::config::TriggerMode;
use crate::submission::{self, QueueStatusView, SubmitReceipt, TeamSubmission};
use crate::worker::{DispatchReport, SchedulerStatus};

// ============================================================================
// SUBMISSION
// ============================================================================

/// POST /submit-endpoint
///
/// Probes the endpoint (unless disabled), then registers the team and queues it.
pub async fn submit_endpoint(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<TeamSubmission>,
) -> Result<Json<SubmitReceipt>, ApiError> {
    if state.probe_on_submit {
        submission::probe_endpoint(&state.client, &body.endpoint_url, state.probe_timeout)
            .await
            .map_err(submit_error)?;
    }

    let receipt = submission::submit(state.store.as_ref(), &body)
        .await
        .map_err(submit_error)?;
    Ok(Json(receipt))
}

/// GET /queue-status/:team_id
pub async fn get_queue_status(
    State(state): State<Arc<ApiState>>,
    Path(team_id): Path<String>,
) -> Result<Json<QueueStatusView>, ApiError> {
    let view = submission::queue_status(
        state.store.as_ref(),
        &team_id,
        state.scheduler.config().poll_interval_secs,
    )
    .await
    .map_err(submit_error)?;
    Ok(Json(view))
}

// ============================================================================
// MANUAL TRIGGER
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessQueueResponse {
    pub message: String,
    pub report: DispatchReport,
}

/// POST /process-queue
///
/// Drains one serial unit or one batch and waits for it. Safe to call
/// repeatedly: an empty or gated queue yields an empty report.
pub async fn process_queue(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ProcessQueueResponse>, ApiError> {
    match state.scheduler.process_now().await {
        Ok(report) => Ok(Json(ProcessQueueResponse {
            message: "Queue processing triggered successfully".to_string(),
            report,
        })),
        Err(e) => {
            error!("Manual queue drain failed: {}", e);
            Err(error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Queue processing failed: {}", e),
            ))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessingStatusResponse {
    pub is_serverless: bool,
    pub mode: String,
    pub note: String,
    pub scheduler: SchedulerStatus,
}

/// GET /process-queue-status
pub async fn get_processing_status(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<ProcessingStatusResponse>, ApiError> {
    let scheduler = state.scheduler.status().await.map_err(|e| {
        error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {}", e),
        )
    })?;

    let is_serverless = scheduler.trigger_mode == TriggerMode::Manual;
    let (mode, note) = if is_serverless {
        (
            "serverless",
            "On serverless, call /process-queue to trigger evaluation",
        )
    } else {
        ("traditional", "Background worker is running")
    };

    Ok(Json(ProcessingStatusResponse {
        is_serverless,
        mode: mode.to_string(),
        note: note.to_string(),
        scheduler,
    }))
}
