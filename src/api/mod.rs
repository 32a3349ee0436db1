//! REST API: manual queue trigger, submission and public read views.

pub mod routes;
pub mod state;

pub use state::ApiState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(routes::health_check))
        // Queue
        .route("/submit-endpoint", post(routes::submit_endpoint))
        .route("/queue-status/:team_id", get(routes::get_queue_status))
        .route("/process-queue", post(routes::process_queue))
        .route("/process-queue-status", get(routes::get_processing_status))
        // Results
        .route("/leaderboard", get(routes::get_leaderboard))
        .route("/team-result/:team_id", get(routes::get_team_result))
        // Plagiarism
        .route("/plagiarism/:team_id", get(routes::get_team_plagiarism))
        .route("/plagiarism-summary", get(routes::get_plagiarism_summary))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
