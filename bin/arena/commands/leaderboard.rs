//! Leaderboard command

use anyhow::Result;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Table};
use predict_arena::types::LeaderboardEntry;

use super::ArenaApi;
use crate::style::*;

pub async fn run(api: &ArenaApi, limit: usize) -> Result<()> {
    print_header("Leaderboard");

    let board: Vec<LeaderboardEntry> = api.get("/leaderboard").await?;
    if board.is_empty() {
        print_info("No evaluated submissions yet");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Rank", "Team", "Accuracy", "F1", "Latency", "Evaluated", "Flag",
        ]);

    for entry in board.iter().take(limit) {
        let flag = if entry.is_plagiarized {
            format!("⚠ {}", entry.plagiarism.similar_teams.join(", "))
                .red()
                .to_string()
        } else {
            String::new()
        };

        table.add_row(vec![
            Cell::new(entry.rank).set_alignment(CellAlignment::Right),
            Cell::new(&entry.team_name),
            Cell::new(percent(entry.accuracy).color(score_color(entry.accuracy))),
            Cell::new(format!("{:.4}", entry.f1_score)),
            Cell::new(format!("{:.1} ms", entry.latency_ms)).set_alignment(CellAlignment::Right),
            Cell::new(entry.evaluated_at.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(flag),
        ]);
    }

    println!("{}", table);
    println!();
    print_key_value("Teams ranked", &board.len().to_string());
    let flagged = board.iter().filter(|e| e.is_plagiarized).count();
    if flagged > 0 {
        print_warning(&format!("{} team(s) flagged for similar predictions", flagged));
    }
    Ok(())
}
