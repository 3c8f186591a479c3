//! VoteCast ingestion and stake aggregation

use alloy::primitives::U256;
use alloy::primitives::utils::format_units;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::error::{Result, SyncError};
use crate::fetcher::EventFetcher;
use crate::store::GovernanceStore;
use crate::types::{
    IdentitySnapshot, StreamKey, Vote, VoteSupport, normalize_address, timestamp_or_now,
};

/// Decimals of the staking token
const STAKE_DECIMALS: u8 = 18;

/// Outcome of one vote ingestion pass
#[derive(Debug, Default, Clone, PartialEq)]
pub struct VoteIngestReport {
    pub from_block: u64,
    pub to_block: u64,
    pub fetched: usize,
    pub inserted: usize,
    pub orphaned: usize,
    pub duplicates: usize,
    pub malformed: usize,
    /// Stake added per proposal in this pass
    pub stake_deltas: BTreeMap<String, f64>,
}

pub struct VoteIngestor {
    fetcher: Arc<EventFetcher>,
    store: Arc<dyn GovernanceStore>,
    checkpoints: Arc<CheckpointStore>,
}

impl VoteIngestor {
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

    /// Ingest VoteCast events from the stream checkpoint up to `head`
    ///
    /// Write order is votes, then proposal aggregates, then the checkpoint. A failure at
    /// any step stops the later ones, so the cursor never gets ahead of the data. Each
    /// aggregate is set to the sum of the proposal's stored votes.
    ///
    /// Votes whose proposal is not stored are dropped. A second vote by the same voter on
    /// the same proposal (already stored, or earlier in this batch) is rejected, which
    /// keeps a re-scan after a crash from counting stake twice.
    pub async fn ingest(&self, head: u64) -> Result<VoteIngestReport> {
        let from_block = self.checkpoints.get(StreamKey::Votes).await?;
        let mut report = VoteIngestReport {
            from_block,
            to_block: head,
            ..Default::default()
        };

        if from_block > head {
            debug!(
                "Vote checkpoint {} is ahead of head {}, nothing to do",
                from_block, head
            );
            return Ok(report);
        }

        let logs = self.fetcher.vote_cast(from_block, head).await?;
        report.fetched = logs.len();

        let voters: Vec<String> = logs
            .iter()
            .map(|log| normalize_address(&log.voter))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let identities = self.store.get_orchestrators(&voters).await?;
        debug!(
            "Resolved {} of {} distinct voters against the directory",
            identities.len(),
            voters.len()
        );

        // proposal id -> voters already counted, or None when the proposal is unknown
        let mut ballots: HashMap<String, Option<HashSet<String>>> = HashMap::new();
        let mut accepted = Vec::new();

        for log in logs {
            let support = VoteSupport::from_code(log.support);

            let Some(proposal_id) = log.proposal_id.filter(|id| !id.is_empty()) else {
                warn!(
                    "Skipping VoteCast at block {} without a proposal id",
                    log.block_number
                );
                report.malformed += 1;
                continue;
            };

            if !ballots.contains_key(&proposal_id) {
                let voted = match self.store.get_proposal(&proposal_id).await? {
                    Some(_) => Some(
                        self.store
                            .votes_for_proposal(&proposal_id)
                            .await?
                            .into_iter()
                            .map(|v| v.voter)
                            .collect::<HashSet<_>>(),
                    ),
                    None => None,
                };
                ballots.insert(proposal_id.clone(), voted);
            }

            let Some(Some(voted)) = ballots.get_mut(&proposal_id) else {
                warn!(
                    "Dropping vote at block {} for unknown proposal {}",
                    log.block_number, proposal_id
                );
                report.orphaned += 1;
                continue;
            };

            let voter = normalize_address(&log.voter);
            if voted.contains(&voter) {
                warn!(
                    "Rejecting duplicate vote by {} on proposal {} at block {}",
                    voter, proposal_id, log.block_number
                );
                report.duplicates += 1;
                continue;
            }

            let stake_amount = match stake_from_base_units(log.weight) {
                Ok(amount) => amount,
                Err(e) => {
                    warn!(
                        "Skipping vote by {} on proposal {}: {}",
                        voter, proposal_id, e
                    );
                    report.malformed += 1;
                    continue;
                }
            };

            voted.insert(voter.clone());
            let identity = IdentitySnapshot::of(identities.get(&voter));

            debug!(
                "Vote {} by {} on proposal {} with stake {}",
                support, voter, proposal_id, stake_amount
            );

            *report.stake_deltas.entry(proposal_id.clone()).or_insert(0.0) += stake_amount;
            accepted.push(Vote {
                proposal_id,
                voter,
                voter_name: identity.name,
                voter_avatar: identity.avatar,
                support,
                stake_amount,
                cast_at: timestamp_or_now(log.block_timestamp),
            });
        }

        report.inserted = accepted.len();
        if !accepted.is_empty() {
            self.store.add_votes(accepted).await?;
        }

        // Totals are recomputed from the stored votes of every known proposal the batch
        // touched, so a re-scan after a failed update repairs the aggregate even when all
        // of its votes come back as duplicates
        let touched: BTreeSet<&String> = ballots
            .iter()
            .filter_map(|(proposal_id, voted)| voted.as_ref().map(|_| proposal_id))
            .collect();
        for proposal_id in touched {
            let total: f64 = self
                .store
                .votes_for_proposal(proposal_id)
                .await?
                .iter()
                .map(|v| v.stake_amount)
                .sum();
            debug!("Proposal {} total stake voted is now {}", proposal_id, total);
            self.store.update_proposal_stake(proposal_id, total).await?;
        }

        self.checkpoints.set(StreamKey::Votes, head + 1).await?;

        info!(
            "Vote ingest {}-{}: {} fetched, {} inserted, {} orphaned, {} duplicate, {} malformed",
            report.from_block,
            report.to_block,
            report.fetched,
            report.inserted,
            report.orphaned,
            report.duplicates,
            report.malformed
        );
        Ok(report)
    }
}

/// Convert a raw token amount (18 decimals) into a decimal stake
pub fn stake_from_base_units(weight: U256) -> Result<f64> {
    let formatted = format_units(weight, STAKE_DECIMALS)
        .map_err(|e| SyncError::Conversion(format!("stake weight {}: {}", weight, e)))?;
    formatted
        .parse::<f64>()
        .map_err(|e| SyncError::Conversion(format!("stake weight {}: {}", formatted, e)))
}
