//! Classification metrics against the held-out labels.

use serde::{Deserialize, Serialize};

/// Label of the class F1 is computed for
pub const POSITIVE_CLASS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub accuracy: f64,
    pub f1_score: f64,
    pub latency_ms: f64,
}

/// Fraction of predictions equal to the ground truth.
pub fn accuracy(y_true: &[i64], y_pred: &[i64]) -> f64 {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return 0.0;
    }
    let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();
    correct as f64 / y_true.len() as f64
}

/// Binary F1 for [`POSITIVE_CLASS`]. Zero when there are no true positives.
pub fn f1_binary(y_true: &[i64], y_pred: &[i64]) -> f64 {
    let mut tp = 0u64;
    let mut fp = 0u64;
    let mut fn_ = 0u64;

    for (&t, &p) in y_true.iter().zip(y_pred) {
        match (t == POSITIVE_CLASS, p == POSITIVE_CLASS) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }

    let denom = 2 * tp + fp + fn_;
    if denom == 0 {
        return 0.0;
    }
    (2 * tp) as f64 / denom as f64
}
