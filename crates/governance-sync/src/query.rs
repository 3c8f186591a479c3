//! Read-only facade for presentation code

use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use crate::directory::DirectorySource;
use crate::error::Result;
use crate::store::GovernanceStore;
use crate::types::{Orchestrator, Proposal, StreamKey, Vote};

/// A proposal with its votes and a stake total recomputed from them
#[derive(Debug, Clone, Serialize)]
pub struct ProposalView {
    pub proposal: Proposal,
    /// Ordered by stake weight, largest first
    pub votes: Vec<Vote>,
    /// Sum of `stake_amount` over `votes`
    pub total_stake_voted: f64,
}

pub struct GovernanceQuery {
    store: Arc<dyn GovernanceStore>,
    source: Option<Arc<dyn DirectorySource>>,
}

impl GovernanceQuery {
    pub fn new(store: Arc<dyn GovernanceStore>, source: Option<Arc<dyn DirectorySource>>) -> Self {
        Self { store, source }
    }

    /// All proposals, newest first, each with its votes
    pub async fn list_proposals(&self) -> Result<Vec<ProposalView>> {
        let proposals = self.store.list_proposals().await?;

        let mut votes_by_proposal: HashMap<String, Vec<Vote>> = HashMap::new();
        for vote in self.store.list_votes().await? {
            votes_by_proposal
                .entry(vote.proposal_id.clone())
                .or_default()
                .push(vote);
        }

        let mut views: Vec<ProposalView> = proposals
            .into_iter()
            .map(|proposal| {
                let mut votes = votes_by_proposal.remove(&proposal.id).unwrap_or_default();
                votes.sort_by(|a, b| {
                    b.stake_amount
                        .partial_cmp(&a.stake_amount)
                        .unwrap_or(Ordering::Equal)
                });
                let total_stake_voted = votes.iter().map(|v| v.stake_amount).sum();
                ProposalView {
                    proposal,
                    votes,
                    total_stake_voted,
                }
            })
            .collect();

        views.sort_by(|a, b| b.proposal.created_at.cmp(&a.proposal.created_at));
        Ok(views)
    }

    pub async fn list_orchestrators(&self) -> Result<Vec<Orchestrator>> {
        self.store.list_orchestrators().await
    }

    /// Region reference data straight from the endpoint; empty when none is configured
    pub async fn list_regions(&self) -> Result<Vec<Value>> {
        match &self.source {
            Some(source) => source.regions().await,
            None => Ok(Vec::new()),
        }
    }

    /// Pipeline reference data straight from the endpoint; empty when none is configured
    pub async fn list_pipelines(&self) -> Result<Vec<Value>> {
        match &self.source {
            Some(source) => source.pipelines().await,
            None => Ok(Vec::new()),
        }
    }

    /// Stored stream cursors; `None` for a stream that has never run
    pub async fn checkpoints(&self) -> Result<Vec<(StreamKey, Option<u64>)>> {
        let mut cursors = Vec::with_capacity(StreamKey::ALL.len());
        for stream in StreamKey::ALL {
            cursors.push((stream, self.store.get_metadata(stream.as_str()).await?));
        }
        Ok(cursors)
    }
}
