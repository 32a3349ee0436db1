//! Plagiarism command

use anyhow::Result;
use colored::{Color, Colorize};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use predict_arena::submission::{PlagiarismOverview, TeamPlagiarismView};

use super::ArenaApi;
use crate::style::*;

pub async fn run(api: &ArenaApi, team_id: Option<&str>) -> Result<()> {
    match team_id {
        Some(team_id) => team(api, team_id).await,
        None => overview(api).await,
    }
}

async fn overview(api: &ArenaApi) -> Result<()> {
    print_header("Plagiarism Summary");

    let summary: PlagiarismOverview = api.get("/plagiarism-summary").await?;
    print_key_value("Teams checked", &summary.total_teams_checked.to_string());
    print_key_value_colored(
        "Clean",
        &summary.clean_teams_count.to_string(),
        Color::Green,
    );
    print_key_value_colored(
        "Flagged",
        &summary.flagged_teams_count.to_string(),
        if summary.flagged_teams_count > 0 {
            Color::Red
        } else {
            Color::Green
        },
    );
    for team in &summary.flagged_team_ids {
        println!("    {} {}", icon_warning(), team);
    }
    Ok(())
}

async fn team(api: &ArenaApi, team_id: &str) -> Result<()> {
    print_header("Plagiarism Check");

    let view: TeamPlagiarismView = api.get(&format!("/plagiarism/{}", team_id)).await?;
    print_key_value("Team", &view.team_id);

    let Some(checked_at) = view.checked_at else {
        print_info("No plagiarism data available for this team");
        return Ok(());
    };
    print_key_value("Checked", &checked_at.format("%Y-%m-%d %H:%M:%S").to_string());

    if !view.is_flagged {
        print_success("No similar submissions found");
        return Ok(());
    }

    print_warning(&format!(
        "Similar to {} team(s)",
        view.summary.similar_teams_count
    ));
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Team", "Similarity"]);
    for m in &view.matches {
        table.add_row(vec![
            Cell::new(&m.team_id),
            Cell::new(format!("{:.4}", m.similarity_score).red()),
        ]);
    }
    println!("{}", table);
    Ok(())
}
