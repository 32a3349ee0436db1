//! Data persistence layer.
//!
//! Everything the scheduler and the read views need goes through
//! [`SubmissionStore`]. The backend is chosen at startup and injected.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{StorageBackend, StorageConfig};
use crate::types::{
    EvaluationResult, LeaderboardInput, PlagiarismRecord, QueueEntry, QueueStatus, Team,
};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    // ==================== Teams ====================

    /// Insert or update a team. `created_at` of an existing team is kept.
    async fn upsert_team(&self, team: &Team) -> Result<()>;
    async fn get_team(&self, team_id: &str) -> Result<Option<Team>>;

    async fn get_team_endpoint(&self, team_id: &str) -> Result<Option<String>> {
        Ok(self
            .get_team(team_id)
            .await?
            .map(|t| t.endpoint_url)
            .filter(|url| !url.is_empty()))
    }

    // ==================== Queue ====================

    /// (Re)queue a team behind every currently queued team; returns its position.
    async fn enqueue(&self, team_id: &str) -> Result<i64>;
    async fn get_queue_entry(&self, team_id: &str) -> Result<Option<QueueEntry>>;

    /// Claim the lowest-position queued team, unless any team is evaluating.
    async fn get_next_serial(&self) -> Result<Option<String>>;

    /// Claim up to `limit` queued teams in position order, ignoring in-flight ones.
    async fn get_next_queued(&self, limit: usize) -> Result<Vec<String>>;

    /// Atomic QUEUED -> EVALUATING. Exactly one concurrent caller gets `true`.
    async fn try_claim(&self, team_id: &str) -> Result<bool>;

    async fn set_queue_status(
        &self,
        team_id: &str,
        status: QueueStatus,
        failure_reason: Option<&str>,
    ) -> Result<()>;

    async fn count_by_status(&self, status: QueueStatus) -> Result<usize>;

    // ==================== Results ====================

    async fn save_result(&self, result: &EvaluationResult) -> Result<()>;
    async fn get_result(&self, team_id: &str) -> Result<Option<EvaluationResult>>;

    async fn save_predictions(&self, team_id: &str, predictions: &[i64]) -> Result<()>;
    async fn get_predictions(&self, team_id: &str) -> Result<Option<Vec<i64>>>;
    async fn delete_predictions(&self, team_id: &str) -> Result<()>;
    async fn get_all_predictions(&self) -> Result<HashMap<String, Vec<i64>>>;

    /// Write the result and plagiarism record and mark the entry COMPLETED as
    /// one unit. A missing queue entry fails with `NotFound` and writes nothing.
    async fn commit_evaluation(
        &self,
        result: &EvaluationResult,
        record: &PlagiarismRecord,
    ) -> Result<()>;

    // ==================== Plagiarism ====================

    async fn save_plagiarism(&self, record: &PlagiarismRecord) -> Result<()>;
    async fn get_plagiarism(&self, team_id: &str) -> Result<Option<PlagiarismRecord>>;
    async fn list_plagiarism(&self) -> Result<Vec<PlagiarismRecord>>;

    // ==================== Leaderboard ====================

    /// Every stored result joined with its team name and plagiarism record.
    /// Results whose team record is missing are skipped.
    async fn get_leaderboard_inputs(&self) -> Result<Vec<LeaderboardInput>>;
}

/// Open the configured backend.
pub fn open(config: &StorageConfig) -> Result<Arc<dyn SubmissionStore>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStore::new())),
        StorageBackend::Sqlite => Ok(Arc::new(SqliteStore::open(&config.path)?)),
    }
}
