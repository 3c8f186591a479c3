use anyhow::{Result, anyhow};
use governance_sync::CycleReport;
use tracing::{error, info};

use crate::cli::GlobalArgs;
use crate::context;

pub async fn handle_start_command(args: &GlobalArgs) -> Result<()> {
    monitoring::init_logging()?;

    let config = context::load_config(args)?;
    info!(
        "Starting governance indexer for governor {} (chain {})",
        config.governor_address, config.chain_id
    );

    let store = context::open_store(&config).await?;
    let scheduler = context::scheduler(&config, store)?;
    scheduler.run(shutdown_signal()).await;

    info!("Governance indexer stopped");
    Ok(())
}

/// Run exactly one ingestion cycle and exit non-zero if any phase failed
pub async fn handle_sync_command(args: &GlobalArgs) -> Result<()> {
    monitoring::init_logging()?;

    let config = context::load_config(args)?;
    let store = context::open_store(&config).await?;
    let scheduler = context::scheduler(&config, store)?;

    let report = scheduler
        .run_cycle()
        .await
        .ok_or_else(|| anyhow!("Ingestion cycle did not run"))?;
    print_report(&report);

    if report.is_success() {
        Ok(())
    } else {
        Err(anyhow!(
            "Ingestion cycle {} failed in {} phase(s)",
            report.cycle,
            report.errors.len()
        ))
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        // keep running; the process can still be killed
        std::future::pending::<()>().await;
    }
}

fn print_report(report: &CycleReport) {
    println!("Cycle {} started {}", report.cycle, report.started_at.to_rfc3339());
    match report.head_block {
        Some(head) => println!("  head block:   {}", head),
        None => println!("  head block:   unavailable"),
    }
    if let Some(directory) = &report.directory {
        println!(
            "  directory:    {} received, {} upserted, {} skipped",
            directory.received, directory.upserted, directory.skipped
        );
    }
    if let Some(proposals) = &report.proposals {
        println!(
            "  proposals:    blocks {}..={}, {} fetched, {} new, {} known, {} without id",
            proposals.from_block,
            proposals.to_block,
            proposals.fetched,
            proposals.inserted,
            proposals.already_known,
            proposals.missing_id
        );
    }
    if let Some(votes) = &report.votes {
        println!(
            "  votes:        blocks {}..={}, {} fetched, {} new, {} orphaned, {} duplicate, {} malformed",
            votes.from_block,
            votes.to_block,
            votes.fetched,
            votes.inserted,
            votes.orphaned,
            votes.duplicates,
            votes.malformed
        );
    }
    if let Some(stats) = &report.rpc_stats {
        println!(
            "  rpc:          {} dispatched, {} rate limited, {} retried",
            stats.dispatched, stats.rate_limited, stats.retried
        );
    }
    for (phase, message) in &report.errors {
        println!("  {} failed: {}", phase, message);
    }
}
