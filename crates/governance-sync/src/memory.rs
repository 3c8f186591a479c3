//! In-process [`GovernanceStore`] backed by ordered maps

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::error::{Result, SyncError};
use crate::store::GovernanceStore;
use crate::types::{Orchestrator, Proposal, Vote};

#[derive(Default)]
struct Tables {
    orchestrators: BTreeMap<String, Orchestrator>,
    proposals: BTreeMap<String, Proposal>,
    votes: Vec<Vote>,
    metadata: HashMap<String, u64>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GovernanceStore for MemoryStore {
    async fn upsert_orchestrators(&self, orchestrators: Vec<Orchestrator>) -> Result<()> {
        let mut tables = self.tables.write().await;
        for orchestrator in orchestrators {
            tables
                .orchestrators
                .insert(orchestrator.address.clone(), orchestrator);
        }
        Ok(())
    }

    async fn get_orchestrator(&self, address: &str) -> Result<Option<Orchestrator>> {
        Ok(self.tables.read().await.orchestrators.get(address).cloned())
    }

    async fn get_orchestrators(
        &self,
        addresses: &[String],
    ) -> Result<HashMap<String, Orchestrator>> {
        let tables = self.tables.read().await;
        Ok(addresses
            .iter()
            .filter_map(|address| {
                tables
                    .orchestrators
                    .get(address)
                    .map(|o| (address.clone(), o.clone()))
            })
            .collect())
    }

    async fn list_orchestrators(&self) -> Result<Vec<Orchestrator>> {
        Ok(self
            .tables
            .read()
            .await
            .orchestrators
            .values()
            .cloned()
            .collect())
    }

    async fn get_proposal(&self, id: &str) -> Result<Option<Proposal>> {
        Ok(self.tables.read().await.proposals.get(id).cloned())
    }

    async fn add_proposal(&self, proposal: Proposal) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.proposals.contains_key(&proposal.id) {
            return Err(SyncError::Store(format!(
                "proposal {} already exists",
                proposal.id
            )));
        }
        tables.proposals.insert(proposal.id.clone(), proposal);
        Ok(())
    }

    async fn update_proposal_stake(&self, id: &str, total_stake_voted: f64) -> Result<()> {
        let mut tables = self.tables.write().await;
        let proposal = tables
            .proposals
            .get_mut(id)
            .ok_or_else(|| SyncError::Store(format!("proposal {} not found", id)))?;
        proposal.total_stake_voted = total_stake_voted;
        Ok(())
    }

    async fn list_proposals(&self) -> Result<Vec<Proposal>> {
        Ok(self.tables.read().await.proposals.values().cloned().collect())
    }

    async fn add_votes(&self, votes: Vec<Vote>) -> Result<()> {
        self.tables.write().await.votes.extend(votes);
        Ok(())
    }

    async fn votes_for_proposal(&self, proposal_id: &str) -> Result<Vec<Vote>> {
        Ok(self
            .tables
            .read()
            .await
            .votes
            .iter()
            .filter(|v| v.proposal_id == proposal_id)
            .cloned()
            .collect())
    }

    async fn list_votes(&self) -> Result<Vec<Vote>> {
        Ok(self.tables.read().await.votes.clone())
    }

    async fn get_metadata(&self, key: &str) -> Result<Option<u64>> {
        Ok(self.tables.read().await.metadata.get(key).copied())
    }

    async fn put_metadata(&self, key: &str, value: u64) -> Result<()> {
        self.tables
            .write()
            .await
            .metadata
            .insert(key.to_string(), value);
        Ok(())
    }
}
