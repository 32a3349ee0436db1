//! Arena server assembly: dataset, store, evaluator, scheduler and HTTP API.

use anyhow::{Context, Result};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

use crate::api::{self, ApiState};
use crate::client::PredictionClient;
use crate::config::{ArenaConfig, TriggerMode};
use crate::dataset::HeldOutSet;
use crate::evaluation::Evaluator;
use crate::storage;
use crate::worker::{QueueScheduler, SimilarityEngine};

/// Everything a running arena needs, built once from configuration.
pub struct Arena {
    pub config: ArenaConfig,
    pub dataset: Arc<HeldOutSet>,
    pub scheduler: Arc<QueueScheduler>,
    pub state: Arc<ApiState>,
}

impl Arena {
    pub fn build(config: ArenaConfig) -> Result<Self> {
        config.validate()?;

        let dataset = match &config.dataset.path {
            Some(path) => HeldOutSet::from_file(path)
                .with_context(|| format!("Failed to load held-out set from {:?}", path))?,
            None => HeldOutSet::synthetic(config.dataset.samples, config.dataset.seed),
        };
        dataset.log_summary();
        let dataset = Arc::new(dataset);

        let store = storage::open(&config.storage).context("Failed to open storage")?;
        let client = PredictionClient::new();

        let evaluator = Evaluator::new(
            dataset.clone(),
            client.clone(),
            config.evaluation.timeout(),
            config.evaluation.retry_policy(),
        );
        let scheduler = Arc::new(QueueScheduler::new(
            store,
            Arc::new(evaluator),
            SimilarityEngine::new(config.similarity.threshold),
            config.scheduler.clone(),
        ));

        let state = Arc::new(ApiState::new(
            scheduler.clone(),
            client,
            config.evaluation.timeout(),
        ));

        Ok(Self {
            config,
            dataset,
            scheduler,
            state,
        })
    }
}

/// Serve the API until `shutdown` resolves, running the background drain
/// when the trigger mode asks for it.
pub async fn run_server(arena: Arena, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
    let Arena {
        config, scheduler, state, ..
    } = arena;

    if config.scheduler.trigger_mode == TriggerMode::Background {
        scheduler.start();
    } else {
        info!("Manual trigger mode: call POST /process-queue to drain the queue");
    }

    let app = api::router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("╔══════════════════════════════════════════════════════════════╗");
    info!("║                Prediction Arena - Evaluation API             ║");
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!("║  Listening on: {:44} ║", addr);
    info!("║  Dispatch:     {:44} ║", config.scheduler.dispatch_mode.as_str());
    info!("║  Trigger:      {:44} ║", config.scheduler.trigger_mode.as_str());
    info!("╠══════════════════════════════════════════════════════════════╣");
    info!("║  Endpoints:                                                  ║");
    info!("║    POST /submit-endpoint       - Register and queue a team   ║");
    info!("║    GET  /queue-status/:team    - Queue position              ║");
    info!("║    POST /process-queue         - Drain one unit or batch     ║");
    info!("║    GET  /process-queue-status  - Scheduler configuration     ║");
    info!("║    GET  /leaderboard           - Ranked results              ║");
    info!("║    GET  /team-result/:team     - Result and rank             ║");
    info!("║    GET  /plagiarism/:team      - Similarity findings         ║");
    info!("║    GET  /plagiarism-summary    - Flag counts                 ║");
    info!("╚══════════════════════════════════════════════════════════════╝");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    scheduler.stop().await;
    info!("Server stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use tempfile::TempDir;

    #[test]
    fn test_build_with_sqlite_and_synthetic_set() {
        let dir = TempDir::new().unwrap();
        let mut config = ArenaConfig::default();
        config.storage.backend = StorageBackend::Sqlite;
        config.storage.path = dir.path().join("arena.db");
        config.dataset.samples = 50;

        let arena = Arena::build(config).unwrap();
        assert_eq!(arena.dataset.len(), 50);
        assert!(!arena.scheduler.is_running());
        assert!(dir.path().join("arena.db").exists());
    }

    #[test]
    fn test_build_rejects_invalid_config() {
        let mut config = ArenaConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.scheduler.max_concurrent = 0;
        assert!(Arena::build(config).is_err());
    }

    #[test]
    fn test_build_reports_missing_dataset_file() {
        let mut config = ArenaConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.dataset.path = Some("/nonexistent/heldout.json".into());
        let err = Arena::build(config).err().unwrap();
        assert!(err.to_string().contains("held-out set"));
    }
}
