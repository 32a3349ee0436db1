//! Held-out evaluation set.
//!
//! Built once at process start and shared read-only (`Arc<HeldOutSet>`) by every
//! evaluation. Either generated from a fixed seed or loaded from a JSON file.

pub mod types;

pub use types::{DatasetFile, FeatureRecord, PredictionRequest, FEATURE_NAMES};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Share of fraudulent transactions in generated data
const POSITIVE_RATE: f64 = 0.1;

/// Share of labels flipped to simulate noise
const LABEL_NOISE: f64 = 0.05;

/// Mean shift of each feature for the positive class. The last two features are
/// redundant (linear mixes of the first ones) and carry no shift of their own.
const CLASS_SHIFT: [f64; 8] = [1.6, -0.8, 1.1, 1.4, 0.9, 1.8, -0.6, -1.2];

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse dataset file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("dataset has {records} records but {labels} labels")]
    LengthMismatch { records: usize, labels: usize },

    #[error("label {label} at index {index} is not a binary class label")]
    InvalidLabel { index: usize, label: i64 },

    #[error("dataset is empty")]
    Empty,
}

/// Labeled feature records used to evaluate every submission identically.
#[derive(Debug, Clone)]
pub struct HeldOutSet {
    records: Vec<FeatureRecord>,
    labels: Vec<i64>,
}

impl HeldOutSet {
    pub fn new(records: Vec<FeatureRecord>, labels: Vec<i64>) -> Result<Self, DatasetError> {
        if records.len() != labels.len() {
            return Err(DatasetError::LengthMismatch {
                records: records.len(),
                labels: labels.len(),
            });
        }
        if records.is_empty() {
            return Err(DatasetError::Empty);
        }
        if let Some((index, &label)) = labels.iter().enumerate().find(|(_, l)| !matches!(l, 0 | 1))
        {
            return Err(DatasetError::InvalidLabel { index, label });
        }
        Ok(Self { records, labels })
    }

    /// Deterministic synthetic fraud-detection data.
    pub fn synthetic(samples: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut records = Vec::with_capacity(samples);
        let mut labels = Vec::with_capacity(samples);

        for i in 0..samples {
            let positive = rng.gen_bool(POSITIVE_RATE);
            let sign = if positive { 1.0 } else { 0.0 };

            let mut f = [0.0f64; 10];
            for (j, shift) in CLASS_SHIFT.iter().enumerate() {
                f[j] = standard_normal(&mut rng) + shift * sign;
            }
            f[8] = 0.6 * f[0] - 0.4 * f[3] + 0.1 * standard_normal(&mut rng);
            f[9] = 0.5 * f[5] + 0.3 * f[2] + 0.1 * standard_normal(&mut rng);

            let label = if rng.gen_bool(LABEL_NOISE) {
                !positive
            } else {
                positive
            };

            records.push(FeatureRecord::from_features(i, f));
            labels.push(i64::from(label));
        }

        Self { records, labels }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let raw = std::fs::read_to_string(path)?;
        let file: DatasetFile = serde_json::from_str(&raw)?;
        Self::new(file.records, file.labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    pub fn request(&self) -> PredictionRequest<'_> {
        PredictionRequest {
            inputs: &self.records,
        }
    }

    pub fn log_summary(&self) {
        info!(
            "Held-out set loaded - Features: {}, Samples: {}",
            FEATURE_NAMES.len(),
            self.len()
        );
        info!(
            "Class distribution - Legitimate: {}, Fraud: {}",
            self.len() - self.positives(),
            self.positives()
        );
    }
}

/// Box-Muller transform over two uniform draws.
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
