//! ProposalCreated ingestion

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::error::Result;
use crate::fetcher::EventFetcher;
use crate::store::GovernanceStore;
use crate::types::{IdentitySnapshot, Proposal, StreamKey, normalize_address, timestamp_or_now};

/// Outcome of one proposal ingestion pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProposalIngestReport {
    pub from_block: u64,
    pub to_block: u64,
    pub fetched: usize,
    pub inserted: usize,
    pub already_known: usize,
    pub missing_id: usize,
}

pub struct ProposalIngestor {
    fetcher: Arc<EventFetcher>,
    store: Arc<dyn GovernanceStore>,
    checkpoints: Arc<CheckpointStore>,
}

impl ProposalIngestor {
    pub fn new(
        fetcher: Arc<EventFetcher>,
        store: Arc<dyn GovernanceStore>,
        checkpoints: Arc<CheckpointStore>,
    ) -> Self {
        Self {
            fetcher,
            store,
            checkpoints,
        }
    }

    /// Ingest ProposalCreated events from the stream checkpoint up to `head`
    ///
    /// The checkpoint is advanced to `head + 1` only after every event was handled. Any
    /// error leaves it untouched; the re-scan is idempotent because known ids are skipped.
    pub async fn ingest(&self, head: u64) -> Result<ProposalIngestReport> {
        let from_block = self.checkpoints.get(StreamKey::Proposals).await?;
        let mut report = ProposalIngestReport {
            from_block,
            to_block: head,
            ..Default::default()
        };

        if from_block > head {
            debug!(
                "Proposal checkpoint {} is ahead of head {}, nothing to do",
                from_block, head
            );
            return Ok(report);
        }

        let logs = self.fetcher.proposal_created(from_block, head).await?;
        report.fetched = logs.len();

        for log in logs {
            let Some(id) = log.proposal_id.filter(|id| !id.is_empty()) else {
                warn!(
                    "Skipping ProposalCreated at block {} without a proposal id",
                    log.block_number
                );
                report.missing_id += 1;
                continue;
            };

            if self.store.get_proposal(&id).await?.is_some() {
                debug!("Proposal {} already stored, skipping", id);
                report.already_known += 1;
                continue;
            }

            let proposer = normalize_address(&log.proposer);
            let identity =
                IdentitySnapshot::of(self.store.get_orchestrator(&proposer).await?.as_ref());

            let proposal = Proposal {
                title: derive_title(&log.description),
                description: log.description,
                proposer,
                proposer_name: identity.name,
                proposer_avatar: identity.avatar,
                created_at: timestamp_or_now(log.block_timestamp),
                total_stake_voted: 0.0,
                id,
            };

            info!(
                "New proposal {} \"{}\" by {} at block {}",
                proposal.id, proposal.title, proposal.proposer, log.block_number
            );
            self.store.add_proposal(proposal).await?;
            report.inserted += 1;
        }

        self.checkpoints.set(StreamKey::Proposals, head + 1).await?;

        info!(
            "Proposal ingest {}-{}: {} fetched, {} inserted, {} already known, {} without id",
            report.from_block,
            report.to_block,
            report.fetched,
            report.inserted,
            report.already_known,
            report.missing_id
        );
        Ok(report)
    }
}

/// Title is the first non-empty line of the description, minus one leading `#`
pub fn derive_title(description: &str) -> String {
    description
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix('#').unwrap_or(line).trim().to_string())
        .unwrap_or_default()
}
