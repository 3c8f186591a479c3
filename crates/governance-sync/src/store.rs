//! Persisted state surface consumed by the ingestion engine
//!
//! Four logical tables: orchestrators (by address), proposals (by id), votes (indexed by
//! proposal id) and metadata checkpoints (by stream key). The ingestion engine is the only
//! writer; the query facade only reads.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::types::{Orchestrator, Proposal, Vote};

#[async_trait]
pub trait GovernanceStore: Send + Sync {
    // ===== Orchestrators =====

    /// Insert or wholesale-replace orchestrators keyed by address
    async fn upsert_orchestrators(&self, orchestrators: Vec<Orchestrator>) -> Result<()>;

    async fn get_orchestrator(&self, address: &str) -> Result<Option<Orchestrator>>;

    /// Batched lookup; addresses with no record are absent from the map
    async fn get_orchestrators(&self, addresses: &[String])
    -> Result<HashMap<String, Orchestrator>>;

    async fn list_orchestrators(&self) -> Result<Vec<Orchestrator>>;

    // ===== Proposals =====

    async fn get_proposal(&self, id: &str) -> Result<Option<Proposal>>;

    /// Insert a new proposal; fails if the id is already present
    async fn add_proposal(&self, proposal: Proposal) -> Result<()>;

    /// Overwrite the cached stake aggregate of an existing proposal
    async fn update_proposal_stake(&self, id: &str, total_stake_voted: f64) -> Result<()>;

    async fn list_proposals(&self) -> Result<Vec<Proposal>>;

    // ===== Votes =====

    /// Insert all votes or none of them
    async fn add_votes(&self, votes: Vec<Vote>) -> Result<()>;

    async fn votes_for_proposal(&self, proposal_id: &str) -> Result<Vec<Vote>>;

    async fn list_votes(&self) -> Result<Vec<Vote>>;

    // ===== Metadata =====

    async fn get_metadata(&self, key: &str) -> Result<Option<u64>>;

    async fn put_metadata(&self, key: &str, value: u64) -> Result<()>;
}
