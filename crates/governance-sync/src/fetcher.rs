//! Range queries over the governance contract's event filters

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::rate_limit::RateLimiterStats;
use crate::rpc::ChainRpc;
use crate::types::{EventKind, GovernanceLog, ProposalCreatedLog, VoteCastLog};

pub struct EventFetcher {
    rpc: Arc<dyn ChainRpc>,
}

impl EventFetcher {
    /// `rpc` should already be wrapped in [`crate::RateLimitedRpc`]
    pub fn new(rpc: Arc<dyn ChainRpc>) -> Self {
        Self { rpc }
    }

    pub fn limiter_stats(&self) -> Option<RateLimiterStats> {
        self.rpc.limiter_stats()
    }

    /// Chain head at the time of the call
    pub async fn head_block(&self) -> Result<u64> {
        Ok(self.rpc.block_number().await?)
    }

    /// Logs of `kind` in `[from_block, to_block]`, in chain order
    ///
    /// An empty range (`from_block > to_block`) returns no logs without touching the network.
    pub async fn fetch_events(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<GovernanceLog>> {
        if from_block > to_block {
            debug!(
                "Nothing to fetch for {}: range {}-{} is empty",
                kind, from_block, to_block
            );
            return Ok(Vec::new());
        }

        debug!("Fetching {} logs in blocks {}-{}", kind, from_block, to_block);
        let logs = self.rpc.logs(kind, from_block, to_block).await?;
        debug!("Fetched {} {} logs", logs.len(), kind);
        Ok(logs)
    }

    pub async fn proposal_created(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ProposalCreatedLog>> {
        let logs = self
            .fetch_events(EventKind::ProposalCreated, from_block, to_block)
            .await?;
        Ok(logs
            .into_iter()
            .filter_map(|log| match log {
                GovernanceLog::ProposalCreated(log) => Some(log),
                other => {
                    warn!("Ignoring unexpected {} log in ProposalCreated query", other.kind());
                    None
                }
            })
            .collect())
    }

    pub async fn vote_cast(&self, from_block: u64, to_block: u64) -> Result<Vec<VoteCastLog>> {
        let logs = self
            .fetch_events(EventKind::VoteCast, from_block, to_block)
            .await?;
        Ok(logs
            .into_iter()
            .filter_map(|log| match log {
                GovernanceLog::VoteCast(log) => Some(log),
                other => {
                    warn!("Ignoring unexpected {} log in VoteCast query", other.kind());
                    None
                }
            })
            .collect())
    }
}
