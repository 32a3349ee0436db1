//! Evaluation pipeline: endpoint call, response validation and scoring.

pub mod evaluator;
pub mod metrics;

pub use evaluator::{score_response, Evaluation, EvaluationFailure, EvaluationOutcome, Evaluator};
pub use metrics::{accuracy, f1_binary, Metrics, POSITIVE_CLASS};
