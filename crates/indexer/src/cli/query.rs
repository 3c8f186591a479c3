use anyhow::Result;
use chrono::{DateTime, Utc};
use governance_sync::{ProposalView, Vote};
use serde_json::Value;

use crate::cli::GlobalArgs;
use crate::context;

const TITLE_WIDTH: usize = 48;

pub async fn handle_proposals_command(
    args: &GlobalArgs,
    json: bool,
    with_votes: bool,
) -> Result<()> {
    monitoring::init_cli_logging()?;

    let config = context::load_config(args)?;
    let query = context::query(&config).await?;
    let mut views = query.list_proposals().await?;

    if json {
        if !with_votes {
            for view in views.iter_mut() {
                view.votes.clear();
            }
        }
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }

    if views.is_empty() {
        println!("No proposals indexed yet");
        return Ok(());
    }

    println!(
        "{:<20} {:<width$} {:<20} {:>6} {:>16}",
        "ID",
        "TITLE",
        "CREATED",
        "VOTES",
        "STAKE VOTED",
        width = TITLE_WIDTH
    );
    for view in &views {
        println!(
            "{:<20} {:<width$} {:<20} {:>6} {:>16.4}",
            shorten(&view.proposal.id, 20),
            shorten(&view.proposal.title, TITLE_WIDTH),
            format_time(&view.proposal.created_at),
            view.votes.len(),
            view.total_stake_voted,
            width = TITLE_WIDTH
        );
        if with_votes {
            print_votes(view);
        }
    }
    Ok(())
}

fn print_votes(view: &ProposalView) {
    for vote in &view.votes {
        println!("    {}", describe_vote(vote));
    }
}

fn describe_vote(vote: &Vote) -> String {
    let who = if vote.voter_name.is_empty() {
        vote.voter.clone()
    } else {
        format!("{} ({})", vote.voter_name, vote.voter)
    };
    format!(
        "{:<8} {:>14.4}  {}  {}",
        vote.support.as_str(),
        vote.stake_amount,
        format_time(&vote.cast_at),
        who
    )
}

pub async fn handle_orchestrators_command(args: &GlobalArgs, json: bool) -> Result<()> {
    monitoring::init_cli_logging()?;

    let config = context::load_config(args)?;
    let query = context::query(&config).await?;
    let orchestrators = query.list_orchestrators().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&orchestrators)?);
        return Ok(());
    }

    if orchestrators.is_empty() {
        println!("No orchestrators synced yet");
        return Ok(());
    }

    println!(
        "{:<42} {:<24} {:>16} {:>8} {:>8} {:<6}",
        "ADDRESS", "NAME", "STAKE", "REWARD", "FEE", "ACTIVE"
    );
    for o in &orchestrators {
        println!(
            "{:<42} {:<24} {:>16.4} {:>8.4} {:>8.4} {:<6}",
            o.address,
            shorten(&o.name, 24),
            o.total_stake,
            o.reward_cut,
            o.fee_cut,
            o.active
        );
    }
    Ok(())
}

pub async fn handle_regions_command(args: &GlobalArgs) -> Result<()> {
    monitoring::init_cli_logging()?;

    let config = context::load_config(args)?;
    let query = context::query(&config).await?;
    print_json(&query.list_regions().await?)
}

pub async fn handle_pipelines_command(args: &GlobalArgs) -> Result<()> {
    monitoring::init_cli_logging()?;

    let config = context::load_config(args)?;
    let query = context::query(&config).await?;
    print_json(&query.list_pipelines().await?)
}

pub async fn handle_checkpoints_command(args: &GlobalArgs) -> Result<()> {
    monitoring::init_cli_logging()?;

    let config = context::load_config(args)?;
    let query = context::query(&config).await?;
    for (stream, block) in query.checkpoints().await? {
        match block {
            Some(block) => println!("{:<20} {}", stream.as_str(), block),
            None => println!(
                "{:<20} not started (genesis {})",
                stream.as_str(),
                config.genesis_block(stream)
            ),
        }
    }
    Ok(())
}

fn print_json(values: &[Value]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(values)?);
    Ok(())
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Truncate to `max` characters, marking the cut with "..."
fn shorten(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}
