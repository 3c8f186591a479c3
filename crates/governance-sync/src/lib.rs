//! Governance Event Synchronization Engine
//!
//! This crate turns a governor contract's event log into a locally queryable dataset of
//! proposals, votes and stake-weighted tallies, cross-referenced against an external
//! orchestrator directory.
//!
//! # Pipeline
//!
//! Each cycle, driven by [`Scheduler`]:
//!
//! 1. [`DirectorySync`] upserts the full orchestrator directory
//! 2. the chain head is snapshotted once
//! 3. [`ProposalIngestor`] stores new ProposalCreated events up to the head
//! 4. [`VoteIngestor`] stores VoteCast events for known proposals and updates tallies
//!
//! Every stream keeps a block cursor in the store ([`CheckpointStore`]) that is advanced
//! only after the data it covers is persisted, so an interrupted cycle is re-scanned on
//! the next tick.
//!
//! The chain, the directory endpoint and the store are traits ([`ChainRpc`],
//! [`DirectorySource`], [`GovernanceStore`]). Chain access goes through
//! [`RateLimitedRpc`], a decorator that enforces the endpoint's rate limits.
//!
//! # Example
//!
//! ```ignore
//! use governance_sync::{IndexerConfig, MemoryStore, RateLimitedRpc, Scheduler, SyncPipeline};
//! use std::sync::Arc;
//!
//! let config = IndexerConfig::from_file("indexer.toml")?;
//! let rpc = Arc::new(RateLimitedRpc::new(my_rpc, config.rate_limit.clone())?);
//! let store = Arc::new(MemoryStore::new());
//! let pipeline = SyncPipeline::from_config(&config, rpc, my_directory, store);
//! let scheduler = Scheduler::new(pipeline, config.sync_interval());
//! scheduler.run(async { tokio::signal::ctrl_c().await.ok(); }).await;
//! ```

pub mod checkpoint;
pub mod config;
pub mod directory;
pub mod error;
pub mod fetcher;
pub mod memory;
pub mod proposals;
pub mod query;
pub mod rate_limit;
pub mod rpc;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod votes;

pub use checkpoint::CheckpointStore;
pub use config::{IndexerConfig, RateLimitConfig};
pub use directory::{DirectorySource, DirectorySync, DirectorySyncReport};
pub use error::{Result, RpcError, SyncError};
pub use fetcher::EventFetcher;
pub use memory::MemoryStore;
pub use proposals::{ProposalIngestReport, ProposalIngestor, derive_title};
pub use query::{GovernanceQuery, ProposalView};
pub use rate_limit::{RateLimitedRpc, RateLimiter, RateLimiterStats};
pub use rpc::ChainRpc;
pub use scheduler::{CycleReport, Phase, Scheduler, SchedulerState, SyncPipeline};
pub use store::GovernanceStore;
pub use types::*;
pub use votes::{VoteIngestReport, VoteIngestor, stake_from_base_units};
