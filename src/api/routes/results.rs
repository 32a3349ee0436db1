//! Leaderboard and per-team result endpoints (no auth required).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{error, submit_error, ApiError};
use crate::api::ApiState;
use crate::leaderboard::build_leaderboard;
use crate::submission::{self, TeamResultView};
use crate::types::LeaderboardEntry;

/// GET /leaderboard
///
/// Rebuilt from stored results on every request.
pub async fn get_leaderboard(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let inputs = state.store.get_leaderboard_inputs().await.map_err(|e| {
        error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {}", e),
        )
    })?;
    Ok(Json(build_leaderboard(inputs)))
}

/// GET /team-result/:team_id
pub async fn get_team_result(
    State(state): State<Arc<ApiState>>,
    Path(team_id): Path<String>,
) -> Result<Json<TeamResultView>, ApiError> {
    let view = submission::team_result(state.store.as_ref(), &team_id)
        .await
        .map_err(submit_error)?;
    Ok(Json(view))
}
