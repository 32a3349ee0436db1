//! API route handlers.
//!
//! - `queue`: submission, queue position and the manual drain trigger
//! - `results`: leaderboard and per-team result
//! - `plagiarism`: similarity findings (no auth required)

pub mod plagiarism;
pub mod queue;
pub mod results;

pub use plagiarism::{get_plagiarism_summary, get_team_plagiarism};
pub use queue::{
    get_processing_status, get_queue_status, process_queue, submit_endpoint,
    ProcessQueueResponse, ProcessingStatusResponse,
};
pub use results::{get_leaderboard, get_team_result};

use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::submission::SubmitError;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            detail: detail.into(),
        }),
    )
}

impl From<SubmitError> for ErrorResponse {
    fn from(err: SubmitError) -> Self {
        Self {
            detail: err.to_string(),
        }
    }
}

pub fn submit_error(err: SubmitError) -> ApiError {
    let status = match &err {
        SubmitError::InvalidEndpoint(_) | SubmitError::AlreadyInFlight(_) => {
            StatusCode::BAD_REQUEST
        }
        SubmitError::NotQueued | SubmitError::TeamNotFound => StatusCode::NOT_FOUND,
        SubmitError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err.into()))
}

pub async fn health_check() -> &'static str {
    "OK"
}
