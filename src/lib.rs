//! Prediction Arena
//!
//! Teams expose an HTTP prediction endpoint; the arena queues each submission,
//! scores it against a held-out set, screens it for copied predictions and
//! ranks it on a leaderboard.
//!
//! ## Module Structure
//!
//! - `types`: queue entries, results and plagiarism records
//! - `config`: layered configuration (defaults, TOML, environment)
//! - `dataset`: the held-out set sent to every endpoint
//! - `client`: HTTP calls to team endpoints with retry
//! - `evaluation`: response validation and metrics
//! - `worker`: queue scheduler and similarity engine
//! - `storage`: submission store trait with memory and SQLite backends
//! - `leaderboard`: ranked view over completed results
//! - `submission`: submit flow and read views
//! - `api`: REST routes
//! - `server`: assembly and serving

pub mod api;
pub mod client;
pub mod config;
pub mod dataset;
pub mod evaluation;
pub mod leaderboard;
pub mod server;
pub mod storage;
pub mod submission;
pub mod types;
pub mod worker;

pub use config::{ArenaConfig, DispatchMode, TriggerMode};
pub use dataset::HeldOutSet;
pub use evaluation::{Evaluation, EvaluationFailure, Evaluator};
pub use leaderboard::build_leaderboard;
pub use server::{run_server, Arena};
pub use storage::{MemoryStore, SqliteStore, StorageError, SubmissionStore};
pub use types::{
    EvaluationResult, LeaderboardEntry, PlagiarismMatch, PlagiarismRecord, QueueEntry,
    QueueStatus, Team,
};
pub use worker::{QueueScheduler, SimilarityEngine};
