//! Plagiarism endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::{submit_error, ApiError};
use crate::api::ApiState;
use crate::submission::{self, PlagiarismOverview, TeamPlagiarismView};

/// GET /plagiarism/:team_id
///
/// Teams that were never checked read as not flagged.
pub async fn get_team_plagiarism(
    State(state): State<Arc<ApiState>>,
    Path(team_id): Path<String>,
) -> Result<Json<TeamPlagiarismView>, ApiError> {
    let view = submission::team_plagiarism(state.store.as_ref(), &team_id)
        .await
        .map_err(submit_error)?;
    Ok(Json(view))
}

/// GET /plagiarism-summary
pub async fn get_plagiarism_summary(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<PlagiarismOverview>, ApiError> {
    let overview = submission::plagiarism_overview(state.store.as_ref())
        .await
        .map_err(submit_error)?;
    Ok(Json(overview))
}
