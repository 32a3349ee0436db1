//! Evaluation Queue Scheduler
//!
//! Owns the queue state machine:
//!
//! ```text
//! QUEUED -> EVALUATING -> COMPLETED
//!                      -> FAILED
//! ```
//!
//! Selection itself performs QUEUED -> EVALUATING through the store's atomic
//! claim, so a team is never dispatched twice. Each dispatched team runs as its
//! own task; a failing or panicking unit is recorded FAILED without touching
//! its siblings.
//!
//! The queue is drained either by the periodic background task started with
//! [`QueueScheduler::start`] or on demand via [`QueueScheduler::process_now`].

use chrono::Utc;
use futures::future::join_all;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::plagiarism::SimilarityEngine;
use crate::config::{DispatchMode, SchedulerConfig, TriggerMode};
use crate::evaluation::{Evaluation, Evaluator};
use crate::storage::{self, StorageError, SubmissionStore};
use crate::types::{EvaluationResult, QueueStatus};

pub const ENDPOINT_NOT_FOUND: &str = "Endpoint URL not found";

fn storage_failure(err: StorageError) -> String {
    format!("Storage error: {}", err)
}

/// How a single dispatched team ended.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Completed { accuracy: f64, is_flagged: bool },
    Failed(String),
}

/// Result of one drain (one serial unit or one batch).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    pub batch_id: String,
    pub dispatch_mode: DispatchMode,
    pub dispatched: Vec<String>,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
}

impl DispatchReport {
    fn empty(dispatch_mode: DispatchMode) -> Self {
        Self {
            batch_id: Uuid::new_v4().to_string(),
            dispatch_mode,
            dispatched: Vec::new(),
            completed: Vec::new(),
            failed: Vec::new(),
        }
    }
}

/// Scheduler configuration and live queue counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerStatus {
    pub dispatch_mode: DispatchMode,
    pub trigger_mode: TriggerMode,
    pub max_concurrent: usize,
    pub poll_interval_secs: u64,
    pub running: bool,
    pub queued: usize,
    pub evaluating: usize,
    pub completed: usize,
    pub failed: usize,
}

struct WorkerHandle {
    task: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

pub struct QueueScheduler {
    store: Arc<dyn SubmissionStore>,
    evaluator: Arc<Evaluator>,
    similarity: SimilarityEngine,
    config: SchedulerConfig,
    /// Bounds evaluations in flight across overlapping drains
    permits: Arc<Semaphore>,
    worker: Mutex<Option<WorkerHandle>>,
}

impl QueueScheduler {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        evaluator: Arc<Evaluator>,
        similarity: SimilarityEngine,
        config: SchedulerConfig,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
        Self {
            store,
            evaluator,
            similarity,
            config,
            permits,
            worker: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SubmissionStore> {
        &self.store
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Claim the next team in serial mode. `None` while any team is evaluating.
    pub async fn next(&self) -> storage::Result<Option<String>> {
        self.store.get_next_serial().await
    }

    /// Claim up to `limit` queued teams in position order.
    pub async fn next_batch(&self, limit: usize) -> storage::Result<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.store.get_next_queued(limit).await
    }

    // ========================================================================
    // Pipeline
    // ========================================================================

    /// Run the evaluation pipeline for a team already moved to EVALUATING.
    ///
    /// The team's predictions are published before the similarity scan so two
    /// teams evaluated side by side still see each other. Result, plagiarism
    /// record and COMPLETED land in one store commit; if that fails the
    /// published predictions are rolled back and the team is marked FAILED.
    pub async fn process_team(&self, team_id: &str) -> UnitOutcome {
        let outcome = match self.run_pipeline(team_id).await {
            Ok(outcome) => outcome,
            Err(reason) => UnitOutcome::Failed(reason),
        };

        match &outcome {
            UnitOutcome::Completed {
                accuracy,
                is_flagged,
            } => {
                info!(
                    "Team {} evaluated: accuracy {:.4}{}",
                    team_id,
                    accuracy,
                    if *is_flagged { " (flagged)" } else { "" }
                );
            }
            UnitOutcome::Failed(reason) => {
                warn!("Team {} evaluation failed: {}", team_id, reason);
                self.mark_failed(team_id, reason).await;
            }
        }
        outcome
    }

    async fn run_pipeline(&self, team_id: &str) -> Result<UnitOutcome, String> {
        let endpoint = self
            .store
            .get_team_endpoint(team_id)
            .await
            .map_err(storage_failure)?
            .ok_or_else(|| ENDPOINT_NOT_FOUND.to_string())?;

        debug!("Evaluating team {} at {}", team_id, endpoint);
        let evaluation = self
            .evaluator
            .evaluate(&endpoint)
            .await
            .map_err(|e| e.to_string())?;

        let previous = self
            .store
            .get_predictions(team_id)
            .await
            .map_err(storage_failure)?;
        self.store
            .save_predictions(team_id, &evaluation.predictions)
            .await
            .map_err(storage_failure)?;

        match self.scan_and_commit(team_id, &evaluation).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.restore_predictions(team_id, previous).await;
                Err(storage_failure(e))
            }
        }
    }

    async fn scan_and_commit(
        &self,
        team_id: &str,
        evaluation: &Evaluation,
    ) -> storage::Result<UnitOutcome> {
        let all_predictions = self.store.get_all_predictions().await?;
        let plagiarism = self
            .similarity
            .check(team_id, &evaluation.predictions, &all_predictions);

        let result = EvaluationResult {
            team_id: team_id.to_string(),
            accuracy: evaluation.metrics.accuracy,
            f1_score: evaluation.metrics.f1_score,
            latency_ms: evaluation.metrics.latency_ms,
            evaluated_at: Utc::now(),
        };
        self.store.commit_evaluation(&result, &plagiarism).await?;

        Ok(UnitOutcome::Completed {
            accuracy: result.accuracy,
            is_flagged: plagiarism.is_flagged,
        })
    }

    /// Put back whatever vector the team had before this run.
    async fn restore_predictions(&self, team_id: &str, previous: Option<Vec<i64>>) {
        let restored = match previous {
            Some(labels) => self.store.save_predictions(team_id, &labels).await,
            None => self.store.delete_predictions(team_id).await,
        };
        if let Err(e) = restored {
            error!("Failed to roll back predictions for team {}: {}", team_id, e);
        }
    }

    async fn mark_failed(&self, team_id: &str, reason: &str) {
        if let Err(e) = self
            .store
            .set_queue_status(team_id, QueueStatus::Failed, Some(reason))
            .await
        {
            error!("Failed to record failure for team {}: {}", team_id, e);
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Drain one serial unit or one batch, waiting for every dispatched unit.
    pub async fn process_now(self: &Arc<Self>) -> storage::Result<DispatchReport> {
        let mut report = DispatchReport::empty(self.config.dispatch_mode);

        let claimed = match self.config.dispatch_mode {
            DispatchMode::Serial => self.next().await?.into_iter().collect::<Vec<_>>(),
            DispatchMode::BoundedParallel => {
                let limit = self
                    .config
                    .max_concurrent
                    .min(self.permits.available_permits());
                self.next_batch(limit).await?
            }
        };

        if claimed.is_empty() {
            debug!("Queue drain {}: nothing to dispatch", report.batch_id);
            return Ok(report);
        }

        info!(
            "Queue drain {}: dispatching {} team(s) ({})",
            report.batch_id,
            claimed.len(),
            self.config.dispatch_mode.as_str()
        );

        let handles: Vec<JoinHandle<UnitOutcome>> = claimed
            .iter()
            .map(|team_id| {
                let scheduler = Arc::clone(self);
                let team_id = team_id.clone();
                tokio::spawn(async move {
                    let _permit = scheduler.permits.clone().acquire_owned().await;
                    scheduler.process_team(&team_id).await
                })
            })
            .collect();

        for (team_id, joined) in claimed.iter().zip(join_all(handles).await) {
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    let reason = if e.is_panic() {
                        "Evaluation task panicked".to_string()
                    } else {
                        format!("Evaluation task aborted: {}", e)
                    };
                    error!("Team {}: {}", team_id, reason);
                    self.mark_failed(team_id, &reason).await;
                    UnitOutcome::Failed(reason)
                }
            };
            match outcome {
                UnitOutcome::Completed { .. } => report.completed.push(team_id.clone()),
                UnitOutcome::Failed(_) => report.failed.push(team_id.clone()),
            }
        }
        report.dispatched = claimed;

        info!(
            "Queue drain {} finished: {} completed, {} failed",
            report.batch_id,
            report.completed.len(),
            report.failed.len()
        );
        Ok(report)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Spawn the periodic drain task. A second call while running is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            warn!("Queue scheduler already running");
            return;
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let scheduler = Arc::clone(self);
        let poll_interval = self.config.poll_interval();

        info!(
            "Starting queue scheduler ({}, max {} concurrent, every {}s)",
            self.config.dispatch_mode.as_str(),
            self.config.max_concurrent,
            poll_interval.as_secs()
        );

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = scheduler.process_now().await {
                            error!("Queue drain failed: {}", e);
                        }
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Queue scheduler stopped");
        });

        *worker = Some(WorkerHandle { task, shutdown_tx });
    }

    /// Signal the drain task and wait for it to finish its current drain.
    pub async fn stop(&self) {
        let handle = self.worker.lock().take();
        let Some(handle) = handle else {
            return;
        };

        if let Err(e) = handle.shutdown_tx.send(true) {
            warn!("Failed to send shutdown signal to scheduler: {}", e);
        }
        if let Err(e) = handle.task.await {
            error!("Queue scheduler task ended abnormally: {}", e);
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.lock().is_some()
    }

    pub async fn status(&self) -> storage::Result<SchedulerStatus> {
        Ok(SchedulerStatus {
            dispatch_mode: self.config.dispatch_mode,
            trigger_mode: self.config.trigger_mode,
            max_concurrent: self.config.max_concurrent,
            poll_interval_secs: self.config.poll_interval_secs,
            running: self.is_running(),
            queued: self.store.count_by_status(QueueStatus::Queued).await?,
            evaluating: self.store.count_by_status(QueueStatus::Evaluating).await?,
            completed: self.store.count_by_status(QueueStatus::Completed).await?,
            failed: self.store.count_by_status(QueueStatus::Failed).await?,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{PredictionClient, RetryPolicy};
    use crate::dataset::HeldOutSet;
    use crate::storage::MemoryStore;
    use crate::types::{LeaderboardInput, PlagiarismRecord, QueueEntry, Team};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    const SAMPLES: usize = 20;

    fn dataset() -> Arc<HeldOutSet> {
        Arc::new(HeldOutSet::synthetic(SAMPLES, 7))
    }

    fn scheduler(
        store: Arc<dyn SubmissionStore>,
        dataset: Arc<HeldOutSet>,
        dispatch_mode: DispatchMode,
        max_concurrent: usize,
    ) -> Arc<QueueScheduler> {
        let evaluator = Evaluator::new(
            dataset,
            PredictionClient::new(),
            Duration::from_secs(2),
            RetryPolicy::immediate(0),
        );
        let config = SchedulerConfig {
            dispatch_mode,
            trigger_mode: TriggerMode::Manual,
            max_concurrent,
            poll_interval_secs: 1,
        };
        Arc::new(QueueScheduler::new(
            store,
            Arc::new(evaluator),
            SimilarityEngine::default(),
            config,
        ))
    }

    /// Memory store with injectable write failures and a slow similarity scan.
    #[derive(Default)]
    struct FaultyStore {
        inner: MemoryStore,
        fail_predictions: bool,
        fail_commit: bool,
        scan_delay: Duration,
    }

    fn disk_full() -> StorageError {
        StorageError::Database("disk full".to_string())
    }

    #[async_trait]
    impl SubmissionStore for FaultyStore {
        async fn upsert_team(&self, team: &Team) -> storage::Result<()> {
            self.inner.upsert_team(team).await
        }
        async fn get_team(&self, team_id: &str) -> storage::Result<Option<Team>> {
            self.inner.get_team(team_id).await
        }
        async fn enqueue(&self, team_id: &str) -> storage::Result<i64> {
            self.inner.enqueue(team_id).await
        }
        async fn get_queue_entry(&self, team_id: &str) -> storage::Result<Option<QueueEntry>> {
            self.inner.get_queue_entry(team_id).await
        }
        async fn get_next_serial(&self) -> storage::Result<Option<String>> {
            self.inner.get_next_serial().await
        }
        async fn get_next_queued(&self, limit: usize) -> storage::Result<Vec<String>> {
            self.inner.get_next_queued(limit).await
        }
        async fn try_claim(&self, team_id: &str) -> storage::Result<bool> {
            self.inner.try_claim(team_id).await
        }
        async fn set_queue_status(
            &self,
            team_id: &str,
            status: QueueStatus,
            failure_reason: Option<&str>,
        ) -> storage::Result<()> {
            self.inner
                .set_queue_status(team_id, status, failure_reason)
                .await
        }
        async fn count_by_status(&self, status: QueueStatus) -> storage::Result<usize> {
            self.inner.count_by_status(status).await
        }
        async fn save_result(&self, result: &EvaluationResult) -> storage::Result<()> {
            self.inner.save_result(result).await
        }
        async fn get_result(&self, team_id: &str) -> storage::Result<Option<EvaluationResult>> {
            self.inner.get_result(team_id).await
        }
        async fn save_predictions(&self, team_id: &str, predictions: &[i64]) -> storage::Result<()> {
            if self.fail_predictions {
                return Err(disk_full());
            }
            self.inner.save_predictions(team_id, predictions).await
        }
        async fn get_predictions(&self, team_id: &str) -> storage::Result<Option<Vec<i64>>> {
            self.inner.get_predictions(team_id).await
        }
        async fn delete_predictions(&self, team_id: &str) -> storage::Result<()> {
            self.inner.delete_predictions(team_id).await
        }
        async fn get_all_predictions(&self) -> storage::Result<HashMap<String, Vec<i64>>> {
            tokio::time::sleep(self.scan_delay).await;
            self.inner.get_all_predictions().await
        }
        async fn commit_evaluation(
            &self,
            result: &EvaluationResult,
            record: &PlagiarismRecord,
        ) -> storage::Result<()> {
            if self.fail_commit {
                return Err(disk_full());
            }
            self.inner.commit_evaluation(result, record).await
        }
        async fn save_plagiarism(&self, record: &PlagiarismRecord) -> storage::Result<()> {
            self.inner.save_plagiarism(record).await
        }
        async fn get_plagiarism(&self, team_id: &str) -> storage::Result<Option<PlagiarismRecord>> {
            self.inner.get_plagiarism(team_id).await
        }
        async fn list_plagiarism(&self) -> storage::Result<Vec<PlagiarismRecord>> {
            self.inner.list_plagiarism().await
        }
        async fn get_leaderboard_inputs(&self) -> storage::Result<Vec<LeaderboardInput>> {
            self.inner.get_leaderboard_inputs().await
        }
    }

    async fn mock_predict(server: &MockServer, labels: &[i64]) {
        server
            .mock_async(|when, then| {
                when.method(POST).path("/predict");
                then.status(200).json_body(json!({ "predictions": labels }));
            })
            .await;
    }

    async fn register(store: &MemoryStore, team_id: &str, endpoint_url: &str) {
        store
            .upsert_team(&Team {
                team_id: team_id.to_string(),
                team_name: format!("Team {}", team_id),
                endpoint_url: endpoint_url.to_string(),
                owner_id: "owner".to_string(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        store.enqueue(team_id).await.unwrap();
    }

    async fn status_of(store: &MemoryStore, team_id: &str) -> QueueStatus {
        store.get_queue_entry(team_id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn test_parallel_drain_takes_limit_in_order() {
        let data = dataset();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/predict");
                then.status(200)
                    .json_body(json!({ "predictions": data.labels() }));
            })
            .await;

        let store = Arc::new(MemoryStore::new());
        for id in ["t1", "t2", "t3", "t4", "t5"] {
            register(&store, id, &server.url("/predict")).await;
        }

        let scheduler = scheduler(store.clone(), data.clone(), DispatchMode::BoundedParallel, 3);
        let report = scheduler.process_now().await.unwrap();

        assert_eq!(report.dispatched, vec!["t1", "t2", "t3"]);
        assert_eq!(report.completed.len(), 3);
        for id in ["t1", "t2", "t3"] {
            assert_eq!(status_of(&store, id).await, QueueStatus::Completed);
        }
        for id in ["t4", "t5"] {
            assert_eq!(status_of(&store, id).await, QueueStatus::Queued);
        }
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_team() {
        let data = dataset();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/good");
                then.status(200)
                    .json_body(json!({ "predictions": data.labels() }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/short");
                then.status(200)
                    .json_body(json!({ "predictions": vec![0; SAMPLES - 1] }));
            })
            .await;

        let store = Arc::new(MemoryStore::new());
        register(&store, "bad", &server.url("/short")).await;
        register(&store, "good", &server.url("/good")).await;

        let scheduler = scheduler(store.clone(), data, DispatchMode::BoundedParallel, 5);
        let report = scheduler.process_now().await.unwrap();
        assert_eq!(report.completed, vec!["good"]);
        assert_eq!(report.failed, vec!["bad"]);

        let bad = store.get_queue_entry("bad").await.unwrap().unwrap();
        assert_eq!(bad.status, QueueStatus::Failed);
        assert_eq!(
            bad.failure_reason.as_deref(),
            Some(format!("Expected {} predictions, got {}", SAMPLES, SAMPLES - 1).as_str())
        );
        assert!(store.get_result("bad").await.unwrap().is_none());
        assert!(!store.get_all_predictions().await.unwrap().contains_key("bad"));

        assert_eq!(status_of(&store, "good").await, QueueStatus::Completed);
        let result = store.get_result("good").await.unwrap().unwrap();
        assert_eq!(result.accuracy, 1.0);
    }

    #[tokio::test]
    async fn test_missing_endpoint_fails() {
        let store = Arc::new(MemoryStore::new());
        store.enqueue("ghost").await.unwrap();

        let scheduler = scheduler(store.clone(), dataset(), DispatchMode::Serial, 1);
        let report = scheduler.process_now().await.unwrap();
        assert_eq!(report.failed, vec!["ghost"]);

        let entry = store.get_queue_entry("ghost").await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Failed);
        assert_eq!(entry.failure_reason.as_deref(), Some(ENDPOINT_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_serial_gate_blocks_while_evaluating() {
        let store = Arc::new(MemoryStore::new());
        store.enqueue("stale").await.unwrap();
        store.enqueue("waiting").await.unwrap();
        assert!(store.try_claim("stale").await.unwrap());

        let scheduler = scheduler(store.clone(), dataset(), DispatchMode::Serial, 1);
        let report = scheduler.process_now().await.unwrap();
        assert!(report.dispatched.is_empty());
        assert_eq!(status_of(&store, "waiting").await, QueueStatus::Queued);
    }

    #[tokio::test]
    async fn test_identical_predictions_are_flagged() {
        let data = dataset();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/predict");
                then.status(200)
                    .json_body(json!({ "predictions": data.labels() }));
            })
            .await;

        let store = Arc::new(MemoryStore::new());
        register(&store, "original", &server.url("/predict")).await;
        register(&store, "copycat", &server.url("/predict")).await;

        let scheduler = scheduler(store.clone(), data, DispatchMode::Serial, 1);
        scheduler.process_now().await.unwrap();
        scheduler.process_now().await.unwrap();

        let first = store.get_plagiarism("original").await.unwrap().unwrap();
        assert!(!first.is_flagged);

        let second = store.get_plagiarism("copycat").await.unwrap().unwrap();
        assert!(second.is_flagged);
        assert_eq!(second.matches.len(), 1);
        assert_eq!(second.matches[0].team_id, "original");
        assert!((second.matches[0].similarity_score - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_start_and_stop_background_drain() {
        let data = dataset();
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/predict");
                then.status(200)
                    .json_body(json!({ "predictions": data.labels() }));
            })
            .await;

        let store = Arc::new(MemoryStore::new());
        register(&store, "a", &server.url("/predict")).await;

        let scheduler = scheduler(store.clone(), data, DispatchMode::Serial, 1);
        scheduler.start();
        scheduler.start();
        assert!(scheduler.is_running());

        let mut done = false;
        for _ in 0..50 {
            if status_of(&store, "a").await == QueueStatus::Completed {
                done = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(done, "background drain never completed the team");

        scheduler.stop().await;
        assert!(!scheduler.is_running());

        let status = scheduler.status().await.unwrap();
        assert!(!status.running);
        assert_eq!(status.completed, 1);
        assert_eq!(status.dispatch_mode, DispatchMode::Serial);
    }

    #[tokio::test]
    async fn test_failed_prediction_write_leaves_no_result() {
        let data = dataset();
        let server = MockServer::start_async().await;
        mock_predict(&server, data.labels()).await;

        let store = Arc::new(FaultyStore {
            fail_predictions: true,
            ..Default::default()
        });
        register(&store.inner, "a", &server.url("/predict")).await;

        let scheduler = scheduler(store.clone(), data, DispatchMode::BoundedParallel, 5);
        let report = scheduler.process_now().await.unwrap();
        assert_eq!(report.failed, vec!["a"]);

        let entry = store.get_queue_entry("a").await.unwrap().unwrap();
        assert_eq!(entry.status, QueueStatus::Failed);
        assert_eq!(
            entry.failure_reason.as_deref(),
            Some("Storage error: database error: disk full")
        );
        assert!(store.get_result("a").await.unwrap().is_none());
        assert!(store.get_plagiarism("a").await.unwrap().is_none());
        assert!(store.get_leaderboard_inputs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_commit_restores_previous_predictions() {
        let data = dataset();
        let server = MockServer::start_async().await;
        mock_predict(&server, data.labels()).await;

        let store = Arc::new(FaultyStore {
            fail_commit: true,
            ..Default::default()
        });
        register(&store.inner, "old", &server.url("/predict")).await;
        register(&store.inner, "new", &server.url("/predict")).await;
        let earlier = vec![1; SAMPLES];
        store.save_predictions("old", &earlier).await.unwrap();

        let scheduler = scheduler(store.clone(), data, DispatchMode::BoundedParallel, 5);
        let report = scheduler.process_now().await.unwrap();
        assert_eq!(report.failed.len(), 2);

        assert_eq!(store.get_predictions("old").await.unwrap(), Some(earlier));
        assert_eq!(store.get_predictions("new").await.unwrap(), None);
        for id in ["old", "new"] {
            assert_eq!(status_of(&store.inner, id).await, QueueStatus::Failed);
            assert!(store.get_result(id).await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_identical_teams_in_one_batch_are_flagged() {
        let data = dataset();
        let server = MockServer::start_async().await;
        mock_predict(&server, data.labels()).await;

        let store = Arc::new(FaultyStore {
            scan_delay: Duration::from_millis(200),
            ..Default::default()
        });
        register(&store.inner, "a", &server.url("/predict")).await;
        register(&store.inner, "b", &server.url("/predict")).await;

        let scheduler = scheduler(store.clone(), data, DispatchMode::BoundedParallel, 5);
        let report = scheduler.process_now().await.unwrap();
        assert_eq!(report.completed.len(), 2);

        let a = store.get_plagiarism("a").await.unwrap().unwrap();
        let b = store.get_plagiarism("b").await.unwrap().unwrap();
        assert!(a.is_flagged || b.is_flagged);
    }
}
