//! `ChainRpc` over an alloy HTTP provider
//!
//! Both event kinds are fetched with a single `eth_getLogs` call over the whole block range,
//! filtered by governor address and event signature, and decoded with the `sol!` bindings
//! in [`crate::abi`].

use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, Filter, Log};
use alloy::sol_types::SolEvent;
use alloy::transports::http::reqwest::Url;
use alloy::transports::layers::{RateLimitRetryPolicy, RetryPolicy};
use alloy::transports::{RpcError as TransportRpcError, TransportError, TransportErrorKind};
use async_trait::async_trait;
use governance_sync::{
    ChainRpc, EventKind, GovernanceLog, IndexerConfig, ProposalCreatedLog, RpcError, SyncError,
    VoteCastLog, normalize_address,
};
use std::str::FromStr;
use tracing::{debug, warn};

use crate::abi::IGovernor;

/// JSON-RPC error codes providers use for throttling
const RATE_LIMIT_CODES: [i64; 2] = [429, -32005];

/// Governor contract reader
pub struct AlloyGovernorRpc {
    provider: DynProvider,
    governor: Address,
}

impl AlloyGovernorRpc {
    /// Connect to `rpc_url` and read events of the governor at `governor_address`
    ///
    /// No request is made here; a bad endpoint surfaces on the first call.
    pub fn new(rpc_url: &str, governor_address: &str) -> governance_sync::Result<Self> {
        let url = Url::parse(rpc_url).map_err(|e| {
            SyncError::Configuration(format!("Invalid RPC URL '{}': {}", rpc_url, e))
        })?;
        let governor = Address::from_str(governor_address).map_err(|e| {
            SyncError::Configuration(format!(
                "Invalid governor address '{}': {}",
                governor_address, e
            ))
        })?;

        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self { provider, governor })
    }

    pub fn from_config(config: &IndexerConfig) -> governance_sync::Result<Self> {
        Self::new(&config.rpc_url, &config.governor_address)
    }

    pub fn governor(&self) -> Address {
        self.governor
    }
}

#[async_trait]
impl ChainRpc for AlloyGovernorRpc {
    async fn block_number(&self) -> Result<u64, RpcError> {
        self.provider
            .get_block_number()
            .await
            .map_err(classify_transport_error)
    }

    async fn logs(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<GovernanceLog>, RpcError> {
        let signature = match kind {
            EventKind::ProposalCreated => IGovernor::ProposalCreated::SIGNATURE_HASH,
            EventKind::VoteCast => IGovernor::VoteCast::SIGNATURE_HASH,
        };

        let filter = Filter::new()
            .address(self.governor)
            .event_signature(signature)
            .from_block(BlockNumberOrTag::Number(from_block))
            .to_block(BlockNumberOrTag::Number(to_block));

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .map_err(classify_transport_error)?;
        debug!(
            "eth_getLogs {} [{}, {}] returned {} logs",
            kind,
            from_block,
            to_block,
            logs.len()
        );

        let mut decoded = Vec::with_capacity(logs.len());
        for log in &logs {
            if let Some(event) = decode_log(kind, log)? {
                decoded.push(event);
            }
        }
        Ok(decoded)
    }
}

/// Map an alloy transport failure onto the engine's RPC error
///
/// HTTP 429, a JSON-RPC throttling code, or an error message mentioning a rate limit
/// becomes [`RpcError::RateLimited`]; anything else is a transport error. A backoff the
/// provider put in the error data (`{"rate": {"backoff_seconds": N}}`) becomes
/// `retry_after`.
pub fn classify_transport_error(err: TransportError) -> RpcError {
    let rate_limited = match &err {
        TransportRpcError::Transport(TransportErrorKind::HttpError(http)) => http.status == 429,
        TransportRpcError::ErrorResp(payload) => {
            let message = payload.message.to_lowercase();
            RATE_LIMIT_CODES.contains(&payload.code)
                || message.contains("rate limit")
                || message.contains("too many requests")
        }
        _ => false,
    };

    if rate_limited {
        let retry_after = RateLimitRetryPolicy::default().backoff_hint(&err);
        warn!(
            "RPC endpoint is rate limiting (advised backoff {:?}): {}",
            retry_after, err
        );
        RpcError::RateLimited { retry_after }
    } else {
        RpcError::Transport(err.to_string())
    }
}

/// Decode one log of `kind`
///
/// A payload that does not match the event ABI is skipped with a warning. A log without a
/// block number cannot be checkpointed and fails the whole batch.
fn decode_log(kind: EventKind, log: &Log) -> Result<Option<GovernanceLog>, RpcError> {
    let block_number = log.block_number.ok_or_else(|| {
        RpcError::Decode(format!("{} log without a block number", kind))
    })?;

    let event = match kind {
        EventKind::ProposalCreated => match log.log_decode::<IGovernor::ProposalCreated>() {
            Ok(decoded) => {
                let event = decoded.inner.data;
                GovernanceLog::ProposalCreated(ProposalCreatedLog {
                    block_number,
                    proposal_id: Some(event.proposalId.to_string()),
                    proposer: normalize_address(&event.proposer.to_string()),
                    description: event.description,
                    block_timestamp: log.block_timestamp,
                })
            }
            Err(e) => {
                warn!(
                    "Failed to decode ProposalCreated at block {}: {}",
                    block_number, e
                );
                return Ok(None);
            }
        },
        EventKind::VoteCast => match log.log_decode::<IGovernor::VoteCast>() {
            Ok(decoded) => {
                let event = decoded.inner.data;
                GovernanceLog::VoteCast(VoteCastLog {
                    block_number,
                    voter: normalize_address(&event.voter.to_string()),
                    proposal_id: Some(event.proposalId.to_string()),
                    support: event.support,
                    weight: event.weight,
                    block_timestamp: log.block_timestamp,
                })
            }
            Err(e) => {
                warn!("Failed to decode VoteCast at block {}: {}", block_number, e);
                return Ok(None);
            }
        },
    };

    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, LogData, U256, address};
    use alloy::rpc::json_rpc::ErrorPayload;
    use serde_json::value::RawValue;

    const GOVERNOR: Address = address!("0x1000000000000000000000000000000000000001");

    fn rpc_log(data: LogData, block_number: Option<u64>) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: GOVERNOR,
                data,
            },
            block_number,
            block_timestamp: Some(1_700_000_000),
            ..Default::default()
        }
    }

    fn error_resp(code: i64, message: &'static str) -> TransportError {
        TransportRpcError::ErrorResp(ErrorPayload {
            code,
            message: message.into(),
            data: None,
        })
    }

    fn error_resp_with_data(code: i64, message: &'static str, data: &str) -> TransportError {
        TransportRpcError::ErrorResp(ErrorPayload {
            code,
            message: message.into(),
            data: Some(RawValue::from_string(data.to_string()).unwrap()),
        })
    }

    #[test]
    fn test_http_429_is_rate_limited() {
        let err = TransportErrorKind::http_error(429, "Too Many Requests".to_string());
        assert!(classify_transport_error(err).is_rate_limited());
    }

    #[test]
    fn test_http_500_is_transport_error() {
        let err = TransportErrorKind::http_error(500, "upstream failed".to_string());
        assert!(matches!(
            classify_transport_error(err),
            RpcError::Transport(_)
        ));
    }

    #[test]
    fn test_json_rpc_throttling_is_rate_limited() {
        assert!(classify_transport_error(error_resp(429, "slow down")).is_rate_limited());
        assert!(classify_transport_error(error_resp(-32005, "limit exceeded")).is_rate_limited());
        assert!(
            classify_transport_error(error_resp(-32000, "Rate limit reached for project"))
                .is_rate_limited()
        );
        assert!(
            !classify_transport_error(error_resp(-32000, "header not found")).is_rate_limited()
        );
    }

    #[test]
    fn test_provider_backoff_becomes_retry_after() {
        let err = error_resp_with_data(
            429,
            "project ID request rate exceeded",
            r#"{"rate":{"allowed_rps":1,"backoff_seconds":30,"current_rps":1.1}}"#,
        );
        match classify_transport_error(err) {
            RpcError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(std::time::Duration::from_secs(30)));
            }
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_rate_limit_without_backoff_has_no_hint() {
        let err = error_resp_with_data(-32005, "limit exceeded", r#"{"see":"docs"}"#);
        assert!(matches!(
            classify_transport_error(err),
            RpcError::RateLimited { retry_after: None }
        ));

        let err = TransportErrorKind::http_error(429, "Too Many Requests".to_string());
        assert!(matches!(
            classify_transport_error(err),
            RpcError::RateLimited { retry_after: None }
        ));
    }

    #[test]
    fn test_decode_vote_cast() {
        let voter = address!("0x00000000000000000000000000000000000000b2");
        let event = IGovernor::VoteCast {
            voter,
            proposalId: U256::from(42u64),
            support: 1,
            weight: U256::from(2_000_000_000_000_000_000u128),
            reason: "lgtm".to_string(),
        };
        let log = rpc_log(event.encode_log_data(), Some(103));

        let decoded = decode_log(EventKind::VoteCast, &log).unwrap().unwrap();
        let GovernanceLog::VoteCast(vote) = decoded else {
            panic!("expected a VoteCast log");
        };
        assert_eq!(vote.block_number, 103);
        assert_eq!(vote.voter, "0x00000000000000000000000000000000000000b2");
        assert_eq!(vote.proposal_id.as_deref(), Some("42"));
        assert_eq!(vote.support, 1);
        assert_eq!(vote.weight, U256::from(2_000_000_000_000_000_000u128));
        assert_eq!(vote.block_timestamp, Some(1_700_000_000));
    }

    #[test]
    fn test_decode_proposal_created() {
        let proposer = address!("0x00000000000000000000000000000000000000a1");
        let event = IGovernor::ProposalCreated {
            proposalId: U256::from_str(
                "115792089237316195423570985008687907853269984665640564039457584007913129639935",
            )
            .unwrap(),
            proposer,
            targets: vec![GOVERNOR],
            values: vec![U256::ZERO],
            signatures: vec![String::new()],
            calldatas: vec![Bytes::new()],
            voteStart: U256::from(110u64),
            voteEnd: U256::from(200u64),
            description: "# Fund X\nDetails...".to_string(),
        };
        let log = rpc_log(event.encode_log_data(), Some(102));

        let decoded = decode_log(EventKind::ProposalCreated, &log).unwrap().unwrap();
        let GovernanceLog::ProposalCreated(proposal) = decoded else {
            panic!("expected a ProposalCreated log");
        };
        assert_eq!(
            proposal.proposal_id.as_deref(),
            Some("115792089237316195423570985008687907853269984665640564039457584007913129639935")
        );
        assert_eq!(proposal.proposer, "0x00000000000000000000000000000000000000a1");
        assert_eq!(proposal.description, "# Fund X\nDetails...");
    }

    #[test]
    fn test_undecodable_log_is_skipped() {
        let data = LogData::new_unchecked(
            vec![IGovernor::VoteCast::SIGNATURE_HASH],
            Bytes::from_static(&[0xde, 0xad]),
        );
        let log = rpc_log(data, Some(5));

        assert!(decode_log(EventKind::VoteCast, &log).unwrap().is_none());
    }

    #[test]
    fn test_log_without_block_number_fails() {
        let event = IGovernor::VoteCast {
            voter: Address::ZERO,
            proposalId: U256::from(1u64),
            support: 0,
            weight: U256::ZERO,
            reason: String::new(),
        };
        let log = rpc_log(event.encode_log_data(), None);

        assert!(matches!(
            decode_log(EventKind::VoteCast, &log),
            Err(RpcError::Decode(_))
        ));
    }

    #[test]
    fn test_new_rejects_bad_inputs() {
        assert!(
            AlloyGovernorRpc::new("not a url", "0x1000000000000000000000000000000000000001")
                .is_err()
        );
        assert!(AlloyGovernorRpc::new("http://localhost:8545", "0x1234").is_err());

        let rpc = AlloyGovernorRpc::new(
            "http://localhost:8545",
            "0x1000000000000000000000000000000000000001",
        )
        .unwrap();
        assert_eq!(rpc.governor(), GOVERNOR);
    }
}
