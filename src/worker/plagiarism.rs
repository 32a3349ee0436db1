//! Prediction-vector Plagiarism Detection
//!
//! Flags submissions whose predictions on the held-out set are nearly identical to
//! another team's. Two vectors are compared with a composite score:
//!
//! ```text
//! 0.5 * exact_match_ratio + 0.3 * cosine_similarity + 0.2 * hamming_similarity
//! ```
//!
//! For equal-length label vectors the exact-match ratio and the Hamming similarity
//! are the same quantity, so agreement is counted twice against the
//! direction-sensitive cosine term. The weighting is part of the scoring rule and
//! is kept as is.
//!
//! Verdicts:
//! - flagged: at least one other team scores >= threshold
//! - cleared: no match at or above the threshold

use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::types::{PlagiarismMatch, PlagiarismRecord, PlagiarismSummary};

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.95;

const EXACT_WEIGHT: f64 = 0.5;
const COSINE_WEIGHT: f64 = 0.3;
const HAMMING_WEIGHT: f64 = 0.2;

// ============================================================================
// Similarity
// ============================================================================

/// Composite similarity of two label vectors, in [0, 1].
///
/// Vectors of different length (or empty ones) score 0.
pub fn similarity(a: &[i64], b: &[i64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let n = a.len() as f64;
    let matches = a.iter().zip(b).filter(|(x, y)| x == y).count() as f64;
    let mismatches = n - matches;

    let exact_match_ratio = matches / n;
    let cosine = cosine_similarity(a, b);
    let hamming_similarity = 1.0 - mismatches / n;

    EXACT_WEIGHT * exact_match_ratio + COSINE_WEIGHT * cosine + HAMMING_WEIGHT * hamming_similarity
}

/// Cosine similarity of two integer vectors. Two all-zero vectors point the same
/// way (1.0); a single all-zero vector has no direction (0.0).
fn cosine_similarity(a: &[i64], b: &[i64]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    match (norm_a == 0.0, norm_b == 0.0) {
        (true, true) => 1.0,
        (true, false) | (false, true) => 0.0,
        (false, false) => (dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0),
    }
}

// ============================================================================
// Detector
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct SimilarityEngine {
    threshold: f64,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl SimilarityEngine {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_match(&self, score: f64) -> bool {
        score >= self.threshold
    }

    /// Compare `predictions` against every other team's stored predictions.
    ///
    /// The team's own entry in `all_predictions` is skipped. Matches are returned
    /// highest score first; equal scores keep team id order.
    pub fn detect(
        &self,
        team_id: &str,
        predictions: &[i64],
        all_predictions: &HashMap<String, Vec<i64>>,
    ) -> Vec<PlagiarismMatch> {
        let detected_at = Utc::now();

        let mut others: Vec<(&String, &Vec<i64>)> = all_predictions
            .iter()
            .filter(|(other, _)| other.as_str() != team_id)
            .collect();
        others.sort_by(|a, b| a.0.cmp(b.0));

        let mut matches: Vec<PlagiarismMatch> = others
            .into_iter()
            .filter_map(|(other, other_predictions)| {
                let score = similarity(predictions, other_predictions);
                debug!("Similarity {} vs {}: {:.5}", team_id, other, score);
                self.is_match(score).then(|| PlagiarismMatch {
                    team_id: other.clone(),
                    similarity_score: score,
                    detected_at,
                })
            })
            .collect();

        matches.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        matches
    }

    /// Run detection and package the outcome as a storable record.
    pub fn check(
        &self,
        team_id: &str,
        predictions: &[i64],
        all_predictions: &HashMap<String, Vec<i64>>,
    ) -> PlagiarismRecord {
        let matches = self.detect(team_id, predictions, all_predictions);
        let is_flagged = is_plagiarized(&matches);

        info!(
            "Plagiarism check for {}: {} match(es) against {} team(s) -> {}",
            team_id,
            matches.len(),
            all_predictions.keys().filter(|k| k.as_str() != team_id).count(),
            if is_flagged { "flagged" } else { "cleared" }
        );

        PlagiarismRecord {
            team_id: team_id.to_string(),
            is_flagged,
            matches,
            checked_at: Utc::now(),
        }
    }
}

pub fn is_plagiarized(matches: &[PlagiarismMatch]) -> bool {
    !matches.is_empty()
}

/// Condense a sorted match list.
pub fn summarize(matches: &[PlagiarismMatch]) -> PlagiarismSummary {
    if matches.is_empty() {
        return PlagiarismSummary::not_flagged();
    }
    PlagiarismSummary {
        is_flagged: true,
        similar_teams_count: matches.len(),
        highest_similarity: matches.first().map(|m| m.similarity_score),
        similar_teams: matches.iter().map(|m| m.team_id.clone()).collect(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// 99 shared positions (`big`, `ones` ones, zeros) then one differing position.
    fn near_pair(big: i64, ones: usize, last_a: i64, last_b: i64) -> (Vec<i64>, Vec<i64>) {
        let mut shared = vec![big];
        shared.extend(std::iter::repeat(1).take(ones));
        shared.resize(99, 0);

        let mut a = shared.clone();
        let mut b = shared;
        a.push(last_a);
        b.push(last_b);
        (a, b)
    }

    #[test]
    fn test_self_similarity_is_one() {
        let cases: Vec<Vec<i64>> = vec![
            vec![1, 0, 1, 1, 0],
            vec![0, 0, 0, 1],
            vec![1; 100],
            vec![0; 100],
            vec![3, 7, 0, 2],
        ];
        for a in cases {
            assert!((similarity(&a, &a) - 1.0).abs() < 1e-12, "{:?}", a);
        }
    }

    #[test]
    fn test_symmetry() {
        let pairs: Vec<(Vec<i64>, Vec<i64>)> = vec![
            (vec![1, 0, 1, 1], vec![0, 0, 1, 1]),
            (vec![1, 1, 1, 0], vec![0, 0, 0, 1]),
            (vec![0, 0, 0], vec![1, 0, 0]),
            (vec![5, 2, 0], vec![1, 2, 9]),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(&a, &b), similarity(&b, &a));
        }
    }

    #[test]
    fn test_length_mismatch_scores_zero() {
        assert_eq!(similarity(&[1, 0, 1], &[1, 0]), 0.0);
        assert_eq!(similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_composite_weighting() {
        // 3 of 4 agree: exact = hamming = 0.75; cos = 1 / sqrt(2 * 1)
        let a = [1, 1, 0, 0];
        let b = [1, 0, 0, 0];
        let expected = 0.5 * 0.75 + 0.3 * (1.0 / 2f64.sqrt()) + 0.2 * 0.75;
        assert!((similarity(&a, &b) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_opposite_binary_vectors() {
        let a = [1, 0, 1, 0];
        let b = [0, 1, 0, 1];
        assert_eq!(similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_threshold_boundary_scores() {
        let engine = SimilarityEngine::default();

        // composite ~0.9499975
        let (a, b) = near_pair(11, 9, 7, 22);
        let below = similarity(&a, &b);
        assert!(below < 0.95 && below > 0.94999, "below = {}", below);

        // composite ~0.9500016
        let (c, d) = near_pair(9, 8, 4, 13);
        let above = similarity(&c, &d);
        assert!(above >= 0.95 && above < 0.95001, "above = {}", above);

        let stored: HashMap<String, Vec<i64>> = [("other".to_string(), b)].into_iter().collect();
        assert!(engine.detect("me", &a, &stored).is_empty());

        let stored: HashMap<String, Vec<i64>> = [("other".to_string(), d)].into_iter().collect();
        assert_eq!(engine.detect("me", &c, &stored).len(), 1);

        assert!(!engine.is_match(0.94999));
        assert!(engine.is_match(0.95));
        assert!(engine.is_match(0.95001));
    }

    #[test]
    fn test_single_flip_in_binary_vectors() {
        let engine = SimilarityEngine::default();

        // Four positives, one dropped: 0.7 * 0.99 + 0.3 * sqrt(3/4) ~ 0.9528
        let mut a = vec![0i64; 100];
        a[..4].fill(1);
        let mut b = a.clone();
        b[3] = 0;
        assert!(engine.is_match(similarity(&a, &b)));

        // Three positives, one dropped: 0.7 * 0.99 + 0.3 * sqrt(2/3) ~ 0.9379
        let mut c = vec![0i64; 100];
        c[..3].fill(1);
        let mut d = c.clone();
        d[2] = 0;
        assert!(!engine.is_match(similarity(&c, &d)));
    }

    #[test]
    fn test_no_other_predictions() {
        let engine = SimilarityEngine::default();
        let mut all = HashMap::new();
        all.insert("alpha".to_string(), vec![1, 0, 1]);

        let record = engine.check("alpha", &[1, 0, 1], &all);
        assert!(record.matches.is_empty());
        assert!(!record.is_flagged);

        let record = engine.check("alpha", &[1, 0, 1], &HashMap::new());
        assert!(!record.is_flagged);
    }

    #[test]
    fn test_detect_sorts_descending_and_skips_self() {
        let engine = SimilarityEngine::new(0.5);
        let mine = vec![1, 1, 0, 0, 1, 0, 1, 0, 0, 1];

        let mut close = mine.clone();
        close[9] = 0;
        let mut all = HashMap::new();
        all.insert("me".to_string(), mine.clone());
        all.insert("copy".to_string(), mine.clone());
        all.insert("close".to_string(), close);
        all.insert("far".to_string(), mine.iter().map(|v| 1 - v).collect());

        let matches = engine.detect("me", &mine, &all);
        let ids: Vec<&str> = matches.iter().map(|m| m.team_id.as_str()).collect();
        assert_eq!(ids, vec!["copy", "close"]);
        assert!(matches[0].similarity_score >= matches[1].similarity_score);
    }

    #[test]
    fn test_summary() {
        assert_eq!(summarize(&[]), PlagiarismSummary::not_flagged());

        let now = Utc::now();
        let matches = vec![
            PlagiarismMatch {
                team_id: "b".to_string(),
                similarity_score: 0.99,
                detected_at: now,
            },
            PlagiarismMatch {
                team_id: "c".to_string(),
                similarity_score: 0.96,
                detected_at: now,
            },
        ];
        let summary = summarize(&matches);
        assert!(summary.is_flagged);
        assert_eq!(summary.similar_teams_count, 2);
        assert_eq!(summary.highest_similarity, Some(0.99));
        assert_eq!(summary.similar_teams, vec!["b", "c"]);
    }
}
