mod cli;
mod context;

use clap::Parser;
use dotenvy::dotenv;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file from current directory
    dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start => cli::start::handle_start_command(&cli.global).await,
        Commands::Sync => cli::start::handle_sync_command(&cli.global).await,
        Commands::Proposals { json, votes } => {
            cli::query::handle_proposals_command(&cli.global, json, votes).await
        }
        Commands::Orchestrators { json } => {
            cli::query::handle_orchestrators_command(&cli.global, json).await
        }
        Commands::Regions => cli::query::handle_regions_command(&cli.global).await,
        Commands::Pipelines => cli::query::handle_pipelines_command(&cli.global).await,
        Commands::Checkpoints => cli::query::handle_checkpoints_command(&cli.global).await,
    }
}
