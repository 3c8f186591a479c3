//! Configuration loading and component wiring shared by the commands

use anyhow::{Context, Result, anyhow};
use governance_db::SqlStore;
use governance_ethereum::{AlloyGovernorRpc, HttpDirectory};
use governance_sync::{
    DirectorySource, GovernanceQuery, GovernanceStore, IndexerConfig, MemoryStore,
    RateLimitedRpc, Scheduler, SyncPipeline,
};
use std::sync::Arc;
use tracing::info;

use crate::cli::GlobalArgs;

/// `database_url` value selecting the in-process store
const MEMORY_STORE: &str = "memory";

/// Load the TOML file named by `--config`, then apply CLI/env overrides
pub fn load_config(args: &GlobalArgs) -> Result<IndexerConfig> {
    let config = IndexerConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    apply_overrides(config, args)
}

fn apply_overrides(mut config: IndexerConfig, args: &GlobalArgs) -> Result<IndexerConfig> {
    if let Some(rpc_url) = &args.rpc_url {
        config.rpc_url = rpc_url.clone();
    }
    if let Some(database_url) = &args.database_url {
        config.database_url = database_url.clone();
    }
    if let Some(secs) = args.sync_interval_secs {
        config.sync_interval_secs = secs;
    }

    config
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;
    Ok(config)
}

pub async fn open_store(config: &IndexerConfig) -> Result<Arc<dyn GovernanceStore>> {
    if config.database_url.eq_ignore_ascii_case(MEMORY_STORE) {
        info!("Using in-memory store; nothing will be persisted");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = SqlStore::connect(&config.database_url).await?;
    Ok(Arc::new(store))
}

pub fn directory(config: &IndexerConfig) -> Result<Arc<HttpDirectory>> {
    Ok(Arc::new(HttpDirectory::from_config(config)?))
}

/// Scheduler over the rate-limited governor RPC, the HTTP directory and `store`
pub fn scheduler(config: &IndexerConfig, store: Arc<dyn GovernanceStore>) -> Result<Scheduler> {
    let rpc = RateLimitedRpc::new(
        AlloyGovernorRpc::from_config(config)?,
        config.rate_limit.clone(),
    )?;
    let pipeline = SyncPipeline::from_config(config, Arc::new(rpc), directory(config)?, store);
    Ok(Scheduler::new(pipeline, config.sync_interval()))
}

pub async fn query(config: &IndexerConfig) -> Result<GovernanceQuery> {
    let store = open_store(config).await?;
    let source: Arc<dyn DirectorySource> = directory(config)?;
    Ok(GovernanceQuery::new(store, Some(source)))
}
