//! Ranked leaderboard view over completed evaluations.

use std::cmp::Ordering;

use crate::types::{LeaderboardEntry, LeaderboardInput, PlagiarismSummary};
use crate::worker::plagiarism::summarize;

/// Rank results by accuracy, then F1 (both descending), then earliest
/// evaluation. Team id breaks any remaining tie so the output is stable.
pub fn build_leaderboard(inputs: Vec<LeaderboardInput>) -> Vec<LeaderboardEntry> {
    let mut inputs = inputs;
    inputs.sort_by(compare);

    inputs
        .into_iter()
        .enumerate()
        .map(|(i, input)| {
            let plagiarism = input
                .plagiarism
                .as_ref()
                .map(|record| summarize(&record.matches))
                .unwrap_or_else(PlagiarismSummary::not_flagged);
            let is_plagiarized = input
                .plagiarism
                .as_ref()
                .map(|record| record.is_flagged)
                .unwrap_or(false);

            LeaderboardEntry {
                rank: (i + 1) as u32,
                team_id: input.result.team_id,
                team_name: input.team_name,
                accuracy: input.result.accuracy,
                f1_score: input.result.f1_score,
                latency_ms: input.result.latency_ms,
                evaluated_at: input.result.evaluated_at,
                is_plagiarized,
                plagiarism,
            }
        })
        .collect()
}

fn compare(a: &LeaderboardInput, b: &LeaderboardInput) -> Ordering {
    b.result
        .accuracy
        .total_cmp(&a.result.accuracy)
        .then_with(|| b.result.f1_score.total_cmp(&a.result.f1_score))
        .then_with(|| a.result.evaluated_at.cmp(&b.result.evaluated_at))
        .then_with(|| a.result.team_id.cmp(&b.result.team_id))
}

/// Rank of `team_id` on the board, if it has a result.
pub fn rank_of(board: &[LeaderboardEntry], team_id: &str) -> Option<u32> {
    board
        .iter()
        .find(|entry| entry.team_id == team_id)
        .map(|entry| entry.rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EvaluationResult, PlagiarismMatch, PlagiarismRecord};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, minute, 0).unwrap()
    }

    fn input(team_id: &str, accuracy: f64, f1_score: f64, evaluated_at: DateTime<Utc>) -> LeaderboardInput {
        LeaderboardInput {
            result: EvaluationResult {
                team_id: team_id.to_string(),
                accuracy,
                f1_score,
                latency_ms: 50.0,
                evaluated_at,
            },
            team_name: format!("Team {}", team_id),
            plagiarism: None,
        }
    }

    #[test]
    fn test_ordering_accuracy_then_f1() {
        let board = build_leaderboard(vec![
            input("A", 0.90, 0.80, at(10, 0)),
            input("B", 0.90, 0.85, at(10, 5)),
            input("C", 0.95, 0.10, at(10, 10)),
        ]);

        let order: Vec<(&str, u32)> = board
            .iter()
            .map(|e| (e.team_id.as_str(), e.rank))
            .collect();
        assert_eq!(order, vec![("C", 1), ("B", 2), ("A", 3)]);
    }

    #[test]
    fn test_earlier_evaluation_wins_full_tie() {
        let board = build_leaderboard(vec![
            input("late", 0.9, 0.9, at(12, 0)),
            input("early", 0.9, 0.9, at(9, 0)),
        ]);
        assert_eq!(board[0].team_id, "early");
        assert_eq!(rank_of(&board, "late"), Some(2));
        assert_eq!(rank_of(&board, "missing"), None);
    }

    #[test]
    fn test_latency_is_not_a_sort_key() {
        let mut fast = input("fast", 0.8, 0.8, at(11, 0));
        fast.result.latency_ms = 1.0;
        let mut slow = input("slow", 0.8, 0.8, at(10, 0));
        slow.result.latency_ms = 900.0;

        let board = build_leaderboard(vec![fast, slow]);
        assert_eq!(board[0].team_id, "slow");
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let inputs = vec![
            input("A", 0.7, 0.6, at(10, 0)),
            input("B", 0.9, 0.2, at(10, 1)),
            input("C", 0.7, 0.6, at(10, 0)),
            input("D", 0.7, 0.9, at(9, 0)),
        ];
        let first = build_leaderboard(inputs.clone());
        let second = build_leaderboard(inputs.into_iter().rev().collect());
        assert_eq!(first, second);
    }

    #[test]
    fn test_plagiarism_attached() {
        let mut flagged = input("copy", 0.9, 0.9, at(10, 0));
        flagged.plagiarism = Some(PlagiarismRecord {
            team_id: "copy".to_string(),
            is_flagged: true,
            matches: vec![PlagiarismMatch {
                team_id: "orig".to_string(),
                similarity_score: 0.99,
                detected_at: at(10, 0),
            }],
            checked_at: at(10, 0),
        });
        let clean = input("orig", 0.8, 0.8, at(9, 0));

        let board = build_leaderboard(vec![flagged, clean]);
        assert!(board[0].is_plagiarized);
        assert_eq!(board[0].plagiarism.similar_teams, vec!["orig"]);
        assert_eq!(board[0].plagiarism.highest_similarity, Some(0.99));

        assert!(!board[1].is_plagiarized);
        assert_eq!(board[1].plagiarism, PlagiarismSummary::not_flagged());
    }

    #[test]
    fn test_empty_board() {
        assert!(build_leaderboard(Vec::new()).is_empty());
    }
}
