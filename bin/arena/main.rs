//! Arena CLI
//!
//! Submit endpoints and inspect the queue, leaderboard and plagiarism findings
//! of a running arena server.

mod commands;
mod style;

use anyhow::Result;
use clap::{Parser, Subcommand};
use predict_arena::submission::TeamSubmission;

use commands::ArenaApi;

#[derive(Parser, Debug)]
#[command(name = "arena")]
#[command(about = "Prediction Arena CLI", version)]
struct Cli {
    /// Arena server URL
    #[arg(long, default_value = "http://localhost:8000", env = "ARENA_API_URL", global = true)]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the ranked leaderboard
    Leaderboard {
        /// Rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },

    /// Register a team endpoint and queue it for evaluation
    Submit {
        #[arg(long)]
        team_id: String,
        #[arg(long)]
        team_name: String,
        #[arg(long)]
        endpoint: String,
        #[arg(long, default_value = "anonymous", env = "ARENA_OWNER_ID")]
        owner: String,
    },

    /// Show a team's queue position and status
    Status { team_id: String },

    /// Show a team's metrics and rank
    Result { team_id: String },

    /// Drain one unit or batch from the queue now
    Process,

    /// Show scheduler configuration and queue counts
    Scheduler,

    /// Show plagiarism findings (all teams, or one team)
    Plagiarism { team_id: Option<String> },

    /// Check locally that an endpoint answers
    Probe {
        url: String,
        #[arg(long, default_value = "5")]
        timeout: u64,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        style::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let api = ArenaApi::new(&cli.api_url);

    match cli.command {
        Commands::Leaderboard { limit } => commands::leaderboard::run(&api, limit).await,
        Commands::Submit {
            team_id,
            team_name,
            endpoint,
            owner,
        } => {
            commands::queue::submit(
                &api,
                TeamSubmission {
                    team_id,
                    team_name,
                    endpoint_url: endpoint,
                    owner_id: owner,
                },
            )
            .await
        }
        Commands::Status { team_id } => commands::queue::status(&api, &team_id).await,
        Commands::Result { team_id } => commands::queue::result(&api, &team_id).await,
        Commands::Process => commands::queue::process(&api).await,
        Commands::Scheduler => commands::queue::scheduler(&api).await,
        Commands::Plagiarism { team_id } => {
            commands::plagiarism::run(&api, team_id.as_deref()).await
        }
        Commands::Probe { url, timeout } => commands::queue::probe(&url, timeout).await,
    }
}
