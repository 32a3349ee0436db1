//! Background workers: the evaluation queue and the plagiarism scan it runs.

pub mod plagiarism;
pub mod queue;

pub use plagiarism::{is_plagiarized, similarity, summarize, SimilarityEngine};
pub use queue::{DispatchReport, QueueScheduler, SchedulerStatus, UnitOutcome};
