pub mod query;
pub mod start;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "governance-indexer")]
#[command(about = "Governance proposal and vote indexer", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Configuration source and overrides shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Path to the TOML configuration file
    #[arg(long, global = true, env = "INDEXER_CONFIG", default_value = "indexer.toml")]
    pub config: PathBuf,

    /// Override the JSON-RPC endpoint
    #[arg(long, global = true, env = "RPC_URL")]
    pub rpc_url: Option<String>,

    /// Override the store location ("memory" for a throwaway in-process store)
    #[arg(long, global = true, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Override the seconds between ingestion cycles
    #[arg(long, global = true, env = "SYNC_INTERVAL_SECS")]
    pub sync_interval_secs: Option<u64>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run ingestion cycles on a fixed interval until Ctrl-C
    Start,

    /// Run a single ingestion cycle and exit; fails if any phase failed
    Sync,

    /// List stored proposals, newest first
    Proposals {
        /// Print JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,

        /// Include each proposal's votes in the table
        #[arg(long, default_value = "false")]
        votes: bool,
    },

    /// List stored orchestrators
    Orchestrators {
        /// Print JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Fetch region reference data
    Regions,

    /// Fetch pipeline reference data
    Pipelines,

    /// Show the block cursor of each event stream
    Checkpoints,
}
