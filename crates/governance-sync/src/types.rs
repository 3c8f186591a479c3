//! Stored records and raw chain events

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Orchestrator identity as published by the external directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Orchestrator {
    /// Lowercase 0x-prefixed address, primary key
    pub address: String,
    pub name: String,
    pub avatar: String,
    pub total_stake: f64,
    pub reward_cut: f64,
    pub fee_cut: f64,
    pub active: bool,
    pub service_uri: String,
}

/// Display fields of an address, captured at the time it acted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    pub name: String,
    pub avatar: String,
}

impl IdentitySnapshot {
    /// Snapshot an orchestrator's display fields; unknown addresses yield empty strings
    pub fn of(orchestrator: Option<&Orchestrator>) -> Self {
        orchestrator
            .map(|o| Self {
                name: o.name.clone(),
                avatar: o.avatar.clone(),
            })
            .unwrap_or_default()
    }
}

/// A governance proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Decimal rendering of the 256-bit on-chain proposal id
    pub id: String,
    pub title: String,
    pub description: String,
    pub proposer: String,
    pub proposer_name: String,
    pub proposer_avatar: String,
    pub created_at: DateTime<Utc>,
    /// Cached sum of stake over stored votes; only the vote ingestor mutates it
    pub total_stake_voted: f64,
}

/// Support decision carried by a VoteCast event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteSupport {
    Against,
    For,
    Abstain,
}

impl VoteSupport {
    /// Map the on-chain support code: 1 is For, 2 is Abstain, everything else Against
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::For,
            2 => Self::Abstain,
            _ => Self::Against,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Against => "Against",
            Self::For => "For",
            Self::Abstain => "Abstain",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Against" => Some(Self::Against),
            "For" => Some(Self::For),
            "Abstain" => Some(Self::Abstain),
            _ => None,
        }
    }
}

impl fmt::Display for VoteSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stake-weighted ballot on a proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub proposal_id: String,
    pub voter: String,
    pub voter_name: String,
    pub voter_avatar: String,
    pub support: VoteSupport,
    pub stake_amount: f64,
    pub cast_at: DateTime<Utc>,
}

/// Independently checkpointed event streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKey {
    Proposals,
    Votes,
}

impl StreamKey {
    pub const ALL: [StreamKey; 2] = [StreamKey::Proposals, StreamKey::Votes];

    /// Key under which the stream's cursor lives in the metadata table
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposals => "lastProposalBlock",
            Self::Votes => "lastVoteBlock",
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded ProposalCreated log
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalCreatedLog {
    pub block_number: u64,
    /// `None` when the node returned a log without a usable id
    pub proposal_id: Option<String>,
    pub proposer: String,
    pub description: String,
    /// Block timestamp in seconds, when the node includes it
    pub block_timestamp: Option<u64>,
}

/// Decoded VoteCast log
#[derive(Debug, Clone, PartialEq)]
pub struct VoteCastLog {
    pub block_number: u64,
    pub voter: String,
    pub proposal_id: Option<String>,
    pub support: u8,
    /// Raw stake weight in base units (18 decimals)
    pub weight: U256,
    pub block_timestamp: Option<u64>,
}

/// Event filters the engine knows how to query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ProposalCreated,
    VoteCast,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProposalCreated => f.write_str("ProposalCreated"),
            Self::VoteCast => f.write_str("VoteCast"),
        }
    }
}

/// One decoded governance log, tagged by event kind
#[derive(Debug, Clone, PartialEq)]
pub enum GovernanceLog {
    ProposalCreated(ProposalCreatedLog),
    VoteCast(VoteCastLog),
}

impl GovernanceLog {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::ProposalCreated(_) => EventKind::ProposalCreated,
            Self::VoteCast(_) => EventKind::VoteCast,
        }
    }

    pub fn block_number(&self) -> u64 {
        match self {
            Self::ProposalCreated(log) => log.block_number,
            Self::VoteCast(log) => log.block_number,
        }
    }
}

/// Lowercase an address so lookups are case-insensitive
pub fn normalize_address(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Convert a block timestamp in seconds, falling back to the current time
pub fn timestamp_or_now(seconds: Option<u64>) -> DateTime<Utc> {
    seconds
        .and_then(|s| i64::try_from(s).ok())
        .and_then(|s| DateTime::<Utc>::from_timestamp(s, 0))
        .unwrap_or_else(Utc::now)
}
