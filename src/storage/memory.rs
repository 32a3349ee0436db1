//! In-process store. Used for tests, demos and single-node serverless runs where
//! durability is provided elsewhere.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{Result, StorageError, SubmissionStore};
use crate::types::{
    EvaluationResult, LeaderboardInput, PlagiarismRecord, QueueEntry, QueueStatus, Team,
};

#[derive(Default)]
struct State {
    teams: HashMap<String, Team>,
    queue: HashMap<String, QueueEntry>,
    results: HashMap<String, EvaluationResult>,
    predictions: HashMap<String, Vec<i64>>,
    plagiarism: HashMap<String, PlagiarismRecord>,
}

impl State {
    /// Queued entries sorted by position, ties broken by team id.
    fn queued_in_order(&self) -> Vec<String> {
        let mut queued: Vec<&QueueEntry> = self
            .queue
            .values()
            .filter(|e| e.status == QueueStatus::Queued)
            .collect();
        queued.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then_with(|| a.team_id.cmp(&b.team_id))
        });
        queued.into_iter().map(|e| e.team_id.clone()).collect()
    }

    fn claim(&mut self, team_id: &str) -> bool {
        match self.queue.get_mut(team_id) {
            Some(entry) if entry.status == QueueStatus::Queued => {
                entry.status = QueueStatus::Evaluating;
                entry.failure_reason = None;
                true
            }
            _ => false,
        }
    }
}

/// Every operation runs under a single lock, so multi-key steps (position
/// assignment, gate check plus claim) are atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn upsert_team(&self, team: &Team) -> Result<()> {
        let mut state = self.state.write();
        let created_at = state
            .teams
            .get(&team.team_id)
            .map(|t| t.created_at)
            .unwrap_or(team.created_at);
        state.teams.insert(
            team.team_id.clone(),
            Team {
                created_at,
                ..team.clone()
            },
        );
        Ok(())
    }

    async fn get_team(&self, team_id: &str) -> Result<Option<Team>> {
        Ok(self.state.read().teams.get(team_id).cloned())
    }

    async fn enqueue(&self, team_id: &str) -> Result<i64> {
        let mut state = self.state.write();
        let max_position = state
            .queue
            .values()
            .filter(|e| e.status == QueueStatus::Queued && e.team_id != team_id)
            .map(|e| e.position)
            .max()
            .unwrap_or(0);
        let position = max_position + 1;

        state.queue.insert(
            team_id.to_string(),
            QueueEntry {
                team_id: team_id.to_string(),
                status: QueueStatus::Queued,
                position,
                queued_at: Utc::now(),
                failure_reason: None,
            },
        );
        Ok(position)
    }

    async fn get_queue_entry(&self, team_id: &str) -> Result<Option<QueueEntry>> {
        Ok(self.state.read().queue.get(team_id).cloned())
    }

    async fn get_next_serial(&self) -> Result<Option<String>> {
        let mut state = self.state.write();
        if state
            .queue
            .values()
            .any(|e| e.status == QueueStatus::Evaluating)
        {
            return Ok(None);
        }
        let next = state.queued_in_order().into_iter().next();
        Ok(next.filter(|team_id| state.claim(team_id)))
    }

    async fn get_next_queued(&self, limit: usize) -> Result<Vec<String>> {
        let mut state = self.state.write();
        let candidates = state.queued_in_order();
        let claimed = candidates
            .into_iter()
            .take(limit)
            .filter(|team_id| state.claim(team_id))
            .collect();
        Ok(claimed)
    }

    async fn try_claim(&self, team_id: &str) -> Result<bool> {
        Ok(self.state.write().claim(team_id))
    }

    async fn set_queue_status(
        &self,
        team_id: &str,
        status: QueueStatus,
        failure_reason: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.write();
        let entry = state
            .queue
            .get_mut(team_id)
            .ok_or_else(|| StorageError::NotFound(format!("queue entry {}", team_id)))?;
        entry.status = status;
        entry.failure_reason = failure_reason.map(str::to_string);
        Ok(())
    }

    async fn count_by_status(&self, status: QueueStatus) -> Result<usize> {
        Ok(self
            .state
            .read()
            .queue
            .values()
            .filter(|e| e.status == status)
            .count())
    }

    async fn save_result(&self, result: &EvaluationResult) -> Result<()> {
        self.state
            .write()
            .results
            .insert(result.team_id.clone(), result.clone());
        Ok(())
    }

    async fn get_result(&self, team_id: &str) -> Result<Option<EvaluationResult>> {
        Ok(self.state.read().results.get(team_id).cloned())
    }

    async fn save_predictions(&self, team_id: &str, predictions: &[i64]) -> Result<()> {
        self.state
            .write()
            .predictions
            .insert(team_id.to_string(), predictions.to_vec());
        Ok(())
    }

    async fn get_predictions(&self, team_id: &str) -> Result<Option<Vec<i64>>> {
        Ok(self.state.read().predictions.get(team_id).cloned())
    }

    async fn delete_predictions(&self, team_id: &str) -> Result<()> {
        self.state.write().predictions.remove(team_id);
        Ok(())
    }

    async fn get_all_predictions(&self) -> Result<HashMap<String, Vec<i64>>> {
        Ok(self.state.read().predictions.clone())
    }

    async fn commit_evaluation(
        &self,
        result: &EvaluationResult,
        record: &PlagiarismRecord,
    ) -> Result<()> {
        let mut state = self.state.write();
        let entry = state.queue.get_mut(&result.team_id).ok_or_else(|| {
            StorageError::NotFound(format!("queue entry {}", result.team_id))
        })?;
        entry.status = QueueStatus::Completed;
        entry.failure_reason = None;

        state
            .results
            .insert(result.team_id.clone(), result.clone());
        state
            .plagiarism
            .insert(record.team_id.clone(), record.clone());
        Ok(())
    }

    async fn save_plagiarism(&self, record: &PlagiarismRecord) -> Result<()> {
        self.state
            .write()
            .plagiarism
            .insert(record.team_id.clone(), record.clone());
        Ok(())
    }

    async fn get_plagiarism(&self, team_id: &str) -> Result<Option<PlagiarismRecord>> {
        Ok(self.state.read().plagiarism.get(team_id).cloned())
    }

    async fn list_plagiarism(&self) -> Result<Vec<PlagiarismRecord>> {
        let mut records: Vec<PlagiarismRecord> =
            self.state.read().plagiarism.values().cloned().collect();
        records.sort_by(|a, b| a.team_id.cmp(&b.team_id));
        Ok(records)
    }

    async fn get_leaderboard_inputs(&self) -> Result<Vec<LeaderboardInput>> {
        let state = self.state.read();
        let mut inputs: Vec<LeaderboardInput> = state
            .results
            .values()
            .filter_map(|result| {
                let team = state.teams.get(&result.team_id)?;
                Some(LeaderboardInput {
                    result: result.clone(),
                    team_name: team.team_name.clone(),
                    plagiarism: state.plagiarism.get(&result.team_id).cloned(),
                })
            })
            .collect();
        inputs.sort_by(|a, b| a.result.team_id.cmp(&b.result.team_id));
        Ok(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::conformance;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_enqueue_positions() {
        conformance::enqueue_assigns_increasing_positions(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_requeue() {
        conformance::requeue_resets_entry(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_claim_exclusive() {
        conformance::claim_is_exclusive(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_serial_gate() {
        conformance::serial_respects_single_flight(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_batch_claim() {
        conformance::batch_claims_limit_in_order(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_missing_entry() {
        conformance::set_status_on_missing_entry_fails(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_team_upsert() {
        conformance::team_upsert_keeps_created_at(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_overwrites() {
        conformance::results_and_predictions_overwrite(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_orphan_results() {
        conformance::leaderboard_skips_orphan_results(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_predictions_delete() {
        conformance::predictions_delete_and_lookup(&MemoryStore::new()).await;
    }

    #[tokio::test]
    async fn test_commit_evaluation() {
        conformance::commit_evaluation_is_all_or_nothing(&MemoryStore::new()).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_batches_never_share_a_team() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..40 {
            store.enqueue(&format!("team-{:02}", i)).await.unwrap();
        }

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(
                async move { store.get_next_queued(5).await.unwrap() },
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for handle in handles {
            for team in handle.await.unwrap() {
                assert!(seen.insert(team), "team dispatched twice");
            }
        }
        assert_eq!(seen.len(), 40);
    }
}
