//! Evaluates one team endpoint against the held-out set.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use super::metrics::{accuracy, f1_binary, Metrics};
use crate::client::{EndpointResponse, PredictionClient, RetryPolicy};
use crate::dataset::HeldOutSet;

/// Why an evaluation did not produce metrics. The display text is stored
/// verbatim as the queue entry's failure reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluationFailure {
    #[error("Failed to get response from endpoint")]
    NoResponse,

    #[error("Response missing 'predictions' field")]
    MissingPredictions,

    #[error("Predictions must be a list")]
    NotAList,

    #[error("Expected {expected} predictions, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    #[error("Error calculating metrics: {0}")]
    Metrics(String),
}

/// Metrics plus the raw labels, kept for the similarity scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub metrics: Metrics,
    pub predictions: Vec<i64>,
}

pub type EvaluationOutcome = Result<Evaluation, EvaluationFailure>;

pub struct Evaluator {
    dataset: Arc<HeldOutSet>,
    client: PredictionClient,
    timeout: Duration,
    retry: RetryPolicy,
}

impl Evaluator {
    pub fn new(
        dataset: Arc<HeldOutSet>,
        client: PredictionClient,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            dataset,
            client,
            timeout,
            retry,
        }
    }

    pub fn dataset(&self) -> &HeldOutSet {
        &self.dataset
    }

    /// Call the endpoint once (within the retry budget) and score its answer.
    pub async fn evaluate(&self, endpoint_url: &str) -> EvaluationOutcome {
        let response = self
            .client
            .call(endpoint_url, &self.dataset.request(), self.timeout, &self.retry)
            .await
            .ok_or(EvaluationFailure::NoResponse)?;

        let evaluation = score_response(self.dataset.labels(), &response)?;

        info!(
            "Evaluation complete - Accuracy: {:.4}, F1: {:.4}, Latency: {:.2}ms",
            evaluation.metrics.accuracy, evaluation.metrics.f1_score, evaluation.metrics.latency_ms
        );

        Ok(evaluation)
    }
}

/// Validate the response shape and compute metrics against `labels`.
pub fn score_response(labels: &[i64], response: &EndpointResponse) -> EvaluationOutcome {
    let raw = response
        .body
        .get("predictions")
        .ok_or(EvaluationFailure::MissingPredictions)?;

    let raw = raw.as_array().ok_or(EvaluationFailure::NotAList)?;

    if raw.len() != labels.len() {
        return Err(EvaluationFailure::LengthMismatch {
            expected: labels.len(),
            got: raw.len(),
        });
    }

    let predictions = parse_labels(raw)?;

    Ok(Evaluation {
        metrics: Metrics {
            accuracy: accuracy(labels, &predictions),
            f1_score: f1_binary(labels, &predictions),
            latency_ms: response.latency_ms.max(0.0),
        },
        predictions,
    })
}

/// Accepts integral JSON numbers equal to 0 or 1.
fn parse_labels(raw: &[serde_json::Value]) -> Result<Vec<i64>, EvaluationFailure> {
    raw.iter()
        .enumerate()
        .map(|(i, v)| {
            let label = v
                .as_i64()
                .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .ok_or_else(|| {
                    EvaluationFailure::Metrics(format!(
                        "prediction at index {} is not an integer label: {}",
                        i, v
                    ))
                })?;
            if label != 0 && label != 1 {
                return Err(EvaluationFailure::Metrics(format!(
                    "prediction at index {} has label {}, expected 0 or 1",
                    i, label
                )));
            }
            Ok(label)
        })
        .collect()
}
