//! Core records shared by the store, the scheduler and the read views.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a team's queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Queued,
    Evaluating,
    Completed,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Queued => "QUEUED",
            QueueStatus::Evaluating => "EVALUATING",
            QueueStatus::Completed => "COMPLETED",
            QueueStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "QUEUED" => Some(QueueStatus::Queued),
            "EVALUATING" => Some(QueueStatus::Evaluating),
            "COMPLETED" => Some(QueueStatus::Completed),
            "FAILED" => Some(QueueStatus::Failed),
            _ => None,
        }
    }

    /// A team in one of these states cannot be resubmitted.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, QueueStatus::Queued | QueueStatus::Evaluating)
    }
}

impl fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub team_id: String,
    pub team_name: String,
    pub endpoint_url: String,
    /// Identity of the submitting user, supplied by the auth layer in front of us
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub team_id: String,
    pub status: QueueStatus,
    /// Insertion order among queued teams; only meaningful while `Queued`
    pub position: i64,
    pub queued_at: DateTime<Utc>,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub team_id: String,
    pub accuracy: f64,
    pub f1_score: f64,
    pub latency_ms: f64,
    pub evaluated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlagiarismMatch {
    pub team_id: String,
    pub similarity_score: f64,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlagiarismRecord {
    pub team_id: String,
    pub is_flagged: bool,
    /// Sorted by `similarity_score`, highest first
    pub matches: Vec<PlagiarismMatch>,
    pub checked_at: DateTime<Utc>,
}

/// Condensed view of a plagiarism record, attached to leaderboard rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlagiarismSummary {
    pub is_flagged: bool,
    pub similar_teams_count: usize,
    pub highest_similarity: Option<f64>,
    pub similar_teams: Vec<String>,
}

impl PlagiarismSummary {
    pub fn not_flagged() -> Self {
        Self {
            is_flagged: false,
            similar_teams_count: 0,
            highest_similarity: None,
            similar_teams: Vec::new(),
        }
    }
}

/// One stored result joined with the team name and plagiarism findings.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardInput {
    pub result: EvaluationResult,
    pub team_name: String,
    pub plagiarism: Option<PlagiarismRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub team_id: String,
    pub team_name: String,
    pub accuracy: f64,
    pub f1_score: f64,
    pub latency_ms: f64,
    pub evaluated_at: DateTime<Utc>,
    pub is_plagiarized: bool,
    pub plagiarism: PlagiarismSummary,
}
