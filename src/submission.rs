//! Submission boundary and read views.
//!
//! Teams register an endpoint here; the queue scheduler picks them up from the
//! store. The read views (queue position, team result, plagiarism) are what the
//! HTTP API and the CLI display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::client::{PredictionClient, ProbeOutcome};
use crate::leaderboard::{build_leaderboard, rank_of};
use crate::storage::{StorageError, SubmissionStore};
use crate::types::{PlagiarismMatch, PlagiarismSummary, QueueStatus, Team};
use crate::worker::plagiarism::summarize;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Team is already {0}. Please wait for current evaluation to complete.")]
    AlreadyInFlight(QueueStatus),

    #[error("Team not found in queue")]
    NotQueued,

    #[error("Team not found")]
    TeamNotFound,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

fn default_owner() -> String {
    "anonymous".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSubmission {
    pub team_id: String,
    pub team_name: String,
    pub endpoint_url: String,
    #[serde(default = "default_owner")]
    pub owner_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub message: String,
    pub team_id: String,
    pub queue_position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatusView {
    pub team_id: String,
    pub status: QueueStatus,
    pub position: i64,
    pub estimated_wait_secs: Option<u64>,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamResultView {
    pub team_id: String,
    pub team_name: String,
    pub status: QueueStatus,
    pub rank: Option<u32>,
    pub accuracy: Option<f64>,
    pub f1_score: Option<f64>,
    pub latency_ms: Option<f64>,
    pub evaluated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamPlagiarismView {
    pub team_id: String,
    pub is_flagged: bool,
    pub matches: Vec<PlagiarismMatch>,
    pub summary: PlagiarismSummary,
    pub checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlagiarismOverview {
    pub total_teams_checked: usize,
    pub flagged_teams_count: usize,
    pub clean_teams_count: usize,
    pub flagged_team_ids: Vec<String>,
}

// ============================================================================
// Submission
// ============================================================================

pub fn validate_endpoint_url(url: &str) -> Result<(), SubmitError> {
    if url.starts_with("https://") || url.starts_with("http://") {
        Ok(())
    } else {
        Err(SubmitError::InvalidEndpoint(
            "Endpoint must use HTTP or HTTPS protocol".to_string(),
        ))
    }
}

/// Validate the URL and make sure something answers there.
pub async fn probe_endpoint(
    client: &PredictionClient,
    url: &str,
    timeout: Duration,
) -> Result<(), SubmitError> {
    validate_endpoint_url(url)?;
    match client.probe(url, timeout).await {
        ProbeOutcome::Reachable => Ok(()),
        ProbeOutcome::Unreachable(reason) => Err(SubmitError::InvalidEndpoint(reason)),
    }
}

/// Register (or update) a team and put it at the back of the queue.
///
/// Rejected while the team already has an evaluation queued or running.
pub async fn submit(
    store: &dyn SubmissionStore,
    submission: &TeamSubmission,
) -> Result<SubmitReceipt, SubmitError> {
    validate_endpoint_url(&submission.endpoint_url)?;

    if let Some(entry) = store.get_queue_entry(&submission.team_id).await? {
        if entry.status.is_in_flight() {
            return Err(SubmitError::AlreadyInFlight(entry.status));
        }
    }

    store
        .upsert_team(&Team {
            team_id: submission.team_id.clone(),
            team_name: submission.team_name.clone(),
            endpoint_url: submission.endpoint_url.clone(),
            owner_id: submission.owner_id.clone(),
            created_at: Utc::now(),
        })
        .await?;
    let queue_position = store.enqueue(&submission.team_id).await?;

    info!(
        "Team {} queued at position {}",
        submission.team_id, queue_position
    );

    Ok(SubmitReceipt {
        message: "Successfully added to evaluation queue".to_string(),
        team_id: submission.team_id.clone(),
        queue_position,
    })
}

// ============================================================================
// Read views
// ============================================================================

pub async fn queue_status(
    store: &dyn SubmissionStore,
    team_id: &str,
    poll_interval_secs: u64,
) -> Result<QueueStatusView, SubmitError> {
    let entry = store
        .get_queue_entry(team_id)
        .await?
        .ok_or(SubmitError::NotQueued)?;

    let estimated_wait_secs = (entry.status == QueueStatus::Queued && entry.position > 1)
        .then(|| (entry.position - 1) as u64 * poll_interval_secs);

    Ok(QueueStatusView {
        team_id: entry.team_id,
        status: entry.status,
        position: entry.position,
        estimated_wait_secs,
        failure_reason: entry.failure_reason,
    })
}

pub async fn team_result(
    store: &dyn SubmissionStore,
    team_id: &str,
) -> Result<TeamResultView, SubmitError> {
    let team = store
        .get_team(team_id)
        .await?
        .ok_or(SubmitError::TeamNotFound)?;
    let status = store
        .get_queue_entry(team_id)
        .await?
        .map(|e| e.status)
        .unwrap_or(QueueStatus::Queued);
    let result = store.get_result(team_id).await?;

    let rank = if status == QueueStatus::Completed {
        let board = build_leaderboard(store.get_leaderboard_inputs().await?);
        rank_of(&board, team_id)
    } else {
        None
    };

    Ok(TeamResultView {
        team_id: team.team_id,
        team_name: team.team_name,
        status,
        rank,
        accuracy: result.as_ref().map(|r| r.accuracy),
        f1_score: result.as_ref().map(|r| r.f1_score),
        latency_ms: result.as_ref().map(|r| r.latency_ms),
        evaluated_at: result.as_ref().map(|r| r.evaluated_at),
    })
}

/// A team's plagiarism findings; an unchecked team reads as not flagged.
pub async fn team_plagiarism(
    store: &dyn SubmissionStore,
    team_id: &str,
) -> Result<TeamPlagiarismView, SubmitError> {
    let view = match store.get_plagiarism(team_id).await? {
        Some(record) => TeamPlagiarismView {
            team_id: record.team_id,
            is_flagged: record.is_flagged,
            summary: summarize(&record.matches),
            matches: record.matches,
            checked_at: Some(record.checked_at),
        },
        None => TeamPlagiarismView {
            team_id: team_id.to_string(),
            is_flagged: false,
            matches: Vec::new(),
            summary: PlagiarismSummary::not_flagged(),
            checked_at: None,
        },
    };
    Ok(view)
}

pub async fn plagiarism_overview(
    store: &dyn SubmissionStore,
) -> Result<PlagiarismOverview, SubmitError> {
    let records = store.list_plagiarism().await?;
    let flagged_team_ids: Vec<String> = records
        .iter()
        .filter(|r| r.is_flagged)
        .map(|r| r.team_id.clone())
        .collect();

    Ok(PlagiarismOverview {
        total_teams_checked: records.len(),
        flagged_teams_count: flagged_team_ids.len(),
        clean_teams_count: records.len() - flagged_team_ids.len(),
        flagged_team_ids,
    })
}
