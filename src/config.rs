//! Arena Configuration
//!
//! Defines the configuration for the prediction arena including:
//! - Endpoint call constraints (timeout, retry budget)
//! - Queue dispatch mode and concurrency bound
//! - Plagiarism threshold
//! - Held-out dataset source
//! - Storage backend
//!
//! Values come from `Default`, then an optional TOML file, then environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::client::RetryPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Complete arena configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub evaluation: EvaluationConfig,
    pub scheduler: SchedulerConfig,
    pub similarity: SimilarityConfig,
    pub dataset: DatasetConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
}

/// How the scheduler selects work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// One evaluation in flight platform-wide
    Serial,
    /// Up to `max_concurrent` evaluations per drain
    BoundedParallel,
}

impl DispatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Serial => "serial",
            DispatchMode::BoundedParallel => "bounded_parallel",
        }
    }
}

impl std::str::FromStr for DispatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serial" => Ok(DispatchMode::Serial),
            "parallel" | "bounded_parallel" | "bounded-parallel" => {
                Ok(DispatchMode::BoundedParallel)
            }
            other => Err(format!("unknown dispatch mode '{}'", other)),
        }
    }
}

/// Who drives the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerMode {
    /// A periodic background task drains the queue
    Background,
    /// Only the "process now" action drains the queue (serverless deployments)
    Manual,
}

impl TriggerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerMode::Background => "background",
            TriggerMode::Manual => "manual",
        }
    }
}

impl std::str::FromStr for TriggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "background" | "traditional" => Ok(TriggerMode::Background),
            "manual" | "serverless" => Ok(TriggerMode::Manual),
            other => Err(format!("unknown trigger mode '{}'", other)),
        }
    }
}

/// Endpoint call configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    /// Additional attempts after the first one
    pub max_retries: u32,
    /// Pause between attempts in milliseconds (0 = immediate retry)
    pub retry_delay_ms: u64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            max_retries: 1,
            retry_delay_ms: 0,
        }
    }
}

impl EvaluationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::fixed(self.max_retries, Duration::from_millis(self.retry_delay_ms))
    }
}

/// Queue scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub dispatch_mode: DispatchMode,
    pub trigger_mode: TriggerMode,
    /// Concurrency bound for bounded-parallel drains
    pub max_concurrent: usize,
    /// Seconds between background drains
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            dispatch_mode: DispatchMode::Serial,
            trigger_mode: TriggerMode::Background,
            max_concurrent: 5,
            poll_interval_secs: 5,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Composite score at or above which two submissions are flagged
    pub threshold: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: crate::worker::plagiarism::DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

/// Held-out dataset source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// JSON file with `records` and `labels`; synthetic data is generated when unset
    pub path: Option<PathBuf>,
    pub samples: usize,
    pub seed: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: None,
            samples: 1000,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "sqlite" => Ok(StorageBackend::Sqlite),
            other => Err(format!("unknown storage backend '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// SQLite database file
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: PathBuf::from("./data/arena.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ArenaConfig {
    /// Load a TOML file; missing sections keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults overridden by environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `ARENA_*` environment variables.
    ///
    /// `VERCEL=1` switches to manual triggering, matching serverless deployments.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(v) = env_parse("ARENA_EVALUATION_TIMEOUT_SECS")? {
            self.evaluation.timeout_secs = v;
        }
        if let Some(v) = env_parse("ARENA_MAX_RETRIES")? {
            self.evaluation.max_retries = v;
        }
        if let Some(v) = env_parse("ARENA_RETRY_DELAY_MS")? {
            self.evaluation.retry_delay_ms = v;
        }
        if let Some(v) = env_parse("ARENA_DISPATCH_MODE")? {
            self.scheduler.dispatch_mode = v;
        }
        if let Some(v) = env_parse("ARENA_TRIGGER_MODE")? {
            self.scheduler.trigger_mode = v;
        }
        if std::env::var("VERCEL").map(|v| v == "1").unwrap_or(false) {
            self.scheduler.trigger_mode = TriggerMode::Manual;
        }
        if let Some(v) = env_parse("ARENA_MAX_CONCURRENT_EVALUATIONS")? {
            self.scheduler.max_concurrent = v;
        }
        if let Some(v) = env_parse("ARENA_QUEUE_CHECK_INTERVAL_SECS")? {
            self.scheduler.poll_interval_secs = v;
        }
        if let Some(v) = env_parse("ARENA_SIMILARITY_THRESHOLD")? {
            self.similarity.threshold = v;
        }
        if let Ok(path) = std::env::var("ARENA_DATASET_PATH") {
            self.dataset.path = Some(PathBuf::from(path));
        }
        if let Some(v) = env_parse("ARENA_DATASET_SAMPLES")? {
            self.dataset.samples = v;
        }
        if let Some(v) = env_parse("ARENA_STORAGE_BACKEND")? {
            self.storage.backend = v;
        }
        if let Ok(path) = std::env::var("ARENA_DB_PATH") {
            self.storage.path = PathBuf::from(path);
        }
        if let Ok(host) = std::env::var("ARENA_HOST") {
            self.server.host = host;
        }
        if let Some(v) = env_parse("ARENA_PORT")? {
            self.server.port = v;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                key: "scheduler.max_concurrent",
                value: "0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.similarity.threshold) {
            return Err(ConfigError::InvalidValue {
                key: "similarity.threshold",
                value: self.similarity.threshold.to_string(),
            });
        }
        if self.dataset.path.is_none() && self.dataset.samples == 0 {
            return Err(ConfigError::InvalidValue {
                key: "dataset.samples",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_defaults_match_platform_constants() {
        let config = ArenaConfig::default();
        assert_eq!(config.evaluation.timeout_secs, 5);
        assert_eq!(config.evaluation.max_retries, 1);
        assert_eq!(config.scheduler.max_concurrent, 5);
        assert_eq!(config.scheduler.poll_interval_secs, 5);
        assert_eq!(config.scheduler.dispatch_mode, DispatchMode::Serial);
        assert!((config.similarity.threshold - 0.95).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena.toml");
        std::fs::write(
            &path,
            "[scheduler]\ndispatch_mode = \"bounded_parallel\"\nmax_concurrent = 3\n",
        )
        .unwrap();

        let config = ArenaConfig::from_file(&path).unwrap();
        assert_eq!(config.scheduler.dispatch_mode, DispatchMode::BoundedParallel);
        assert_eq!(config.scheduler.max_concurrent, 3);
        assert_eq!(config.scheduler.poll_interval_secs, 5);
        assert_eq!(config.evaluation.timeout_secs, 5);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena.toml");
        std::fs::write(&path, "[scheduler\n").unwrap();
        assert!(matches!(
            ArenaConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("ARENA_MAX_RETRIES", "3");
        std::env::set_var("ARENA_DISPATCH_MODE", "parallel");
        std::env::set_var("VERCEL", "1");

        let config = ArenaConfig::from_env().unwrap();

        std::env::remove_var("ARENA_MAX_RETRIES");
        std::env::remove_var("ARENA_DISPATCH_MODE");
        std::env::remove_var("VERCEL");

        assert_eq!(config.evaluation.max_retries, 3);
        assert_eq!(config.scheduler.dispatch_mode, DispatchMode::BoundedParallel);
        assert_eq!(config.scheduler.trigger_mode, TriggerMode::Manual);
    }

    #[test]
    #[serial]
    fn test_env_rejects_garbage() {
        std::env::set_var("ARENA_MAX_CONCURRENT_EVALUATIONS", "lots");
        let result = ArenaConfig::from_env();
        std::env::remove_var("ARENA_MAX_CONCURRENT_EVALUATIONS");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key: "ARENA_MAX_CONCURRENT_EVALUATIONS", .. })
        ));
    }

    #[test]
    fn test_zero_concurrency_is_invalid() {
        let mut config = ArenaConfig::default();
        config.scheduler.max_concurrent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = EvaluationConfig {
            timeout_secs: 2,
            max_retries: 2,
            retry_delay_ms: 0,
        };
        let policy = config.retry_policy();
        assert_eq!(policy.total_attempts(), 3);
        assert_eq!(config.timeout(), Duration::from_secs(2));
    }
}
