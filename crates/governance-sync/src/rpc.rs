//! Blockchain transport seam
//!
//! Ingestion code only talks to the chain through [`ChainRpc`], so the rate limiter
//! can be layered on as a decorator and tests can substitute a scripted fake.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::RpcError;
use crate::rate_limit::RateLimiterStats;
use crate::types::{EventKind, GovernanceLog};

/// Read-only access to the governance contract's logs
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// Current head block height
    async fn block_number(&self) -> Result<u64, RpcError>;

    /// Decoded logs of one event kind in `[from_block, to_block]`, in chain order
    async fn logs(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<GovernanceLog>, RpcError>;

    /// Counters of the rate limiter in front of this transport, if there is one
    fn limiter_stats(&self) -> Option<RateLimiterStats> {
        None
    }
}

#[async_trait]
impl<T: ChainRpc + ?Sized> ChainRpc for Arc<T> {
    async fn block_number(&self) -> Result<u64, RpcError> {
        (**self).block_number().await
    }

    async fn logs(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<GovernanceLog>, RpcError> {
        (**self).logs(kind, from_block, to_block).await
    }

    fn limiter_stats(&self) -> Option<RateLimiterStats> {
        (**self).limiter_stats()
    }
}
