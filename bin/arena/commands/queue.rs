//! Submission and queue commands

use anyhow::{bail, Result};
use colored::{Color, Colorize};
use predict_arena::api::routes::{ProcessQueueResponse, ProcessingStatusResponse};
use predict_arena::client::PredictionClient;
use predict_arena::submission::{
    self, QueueStatusView, SubmitReceipt, TeamResultView, TeamSubmission,
};
use std::time::Duration;

use super::ArenaApi;
use crate::style::*;

pub async fn submit(api: &ArenaApi, submission: TeamSubmission) -> Result<()> {
    print_header("Submit Endpoint");
    print_key_value("Team", &format!("{} ({})", submission.team_name, submission.team_id));
    print_key_value("Endpoint", &submission.endpoint_url);
    println!();

    let receipt: SubmitReceipt = api.post("/submit-endpoint", &submission).await?;
    print_success(&receipt.message);
    print_key_value_colored(
        "Queue position",
        &receipt.queue_position.to_string(),
        Color::Cyan,
    );
    Ok(())
}

pub async fn status(api: &ArenaApi, team_id: &str) -> Result<()> {
    print_header("Queue Status");

    let view: QueueStatusView = api.get(&format!("/queue-status/{}", team_id)).await?;
    print_key_value("Team", &view.team_id);
    print_key_value_colored(
        "Status",
        view.status.as_str(),
        status_color(view.status.as_str()),
    );
    print_key_value("Position", &view.position.to_string());
    if let Some(wait) = view.estimated_wait_secs {
        print_key_value("Estimated wait", &format!("~{}s", wait));
    }
    if let Some(reason) = &view.failure_reason {
        print_key_value_colored("Failure", reason, Color::Red);
    }
    Ok(())
}

pub async fn result(api: &ArenaApi, team_id: &str) -> Result<()> {
    print_header("Team Result");

    let view: TeamResultView = api.get(&format!("/team-result/{}", team_id)).await?;
    print_key_value("Team", &format!("{} ({})", view.team_name, view.team_id));
    print_key_value_colored(
        "Status",
        view.status.as_str(),
        status_color(view.status.as_str()),
    );

    match (view.accuracy, view.f1_score) {
        (Some(accuracy), Some(f1)) => {
            print_key_value_colored("Accuracy", &percent(accuracy), score_color(accuracy));
            print_key_value("F1 score", &format!("{:.4}", f1));
            if let Some(latency) = view.latency_ms {
                print_key_value("Latency", &format!("{:.1} ms", latency));
            }
            if let Some(rank) = view.rank {
                print_key_value_colored("Rank", &format!("#{}", rank), Color::Cyan);
            }
        }
        _ => print_info("No evaluation result yet"),
    }
    Ok(())
}

pub async fn process(api: &ArenaApi) -> Result<()> {
    print_header("Process Queue");

    let response: ProcessQueueResponse = api.post_empty("/process-queue").await?;
    let report = response.report;

    if report.dispatched.is_empty() {
        print_info("Nothing dispatched (queue empty or an evaluation is in flight)");
        return Ok(());
    }

    print_key_value("Batch", &report.batch_id);
    print_key_value("Mode", report.dispatch_mode.as_str());
    for team in &report.completed {
        println!("  {} {}", icon_success(), team);
    }
    for team in &report.failed {
        println!("  {} {}", icon_error(), team.red());
    }
    Ok(())
}

pub async fn scheduler(api: &ArenaApi) -> Result<()> {
    print_header("Scheduler");

    let status: ProcessingStatusResponse = api.get("/process-queue-status").await?;
    let s = status.scheduler;
    print_key_value("Mode", &status.mode);
    print_key_value("Dispatch", s.dispatch_mode.as_str());
    print_key_value("Trigger", s.trigger_mode.as_str());
    print_key_value("Max concurrent", &s.max_concurrent.to_string());
    print_key_value("Poll interval", &format!("{}s", s.poll_interval_secs));
    println!();
    print_key_value_colored("Queued", &s.queued.to_string(), Color::Yellow);
    print_key_value_colored("Evaluating", &s.evaluating.to_string(), Color::Cyan);
    print_key_value_colored("Completed", &s.completed.to_string(), Color::Green);
    print_key_value_colored("Failed", &s.failed.to_string(), Color::Red);
    println!();
    println!("  {}", status.note.dimmed());
    Ok(())
}

/// Probe an endpoint from this machine, without going through the server.
pub async fn probe(url: &str, timeout_secs: u64) -> Result<()> {
    print_header("Probe Endpoint");
    print_key_value("Endpoint", url);

    let client = PredictionClient::new();
    match submission::probe_endpoint(&client, url, Duration::from_secs(timeout_secs)).await {
        Ok(()) => {
            print_success("Endpoint is reachable");
            Ok(())
        }
        Err(e) => {
            print_error(&e.to_string());
            bail!("endpoint probe failed")
        }
    }
}
