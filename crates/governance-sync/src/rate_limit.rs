//! Rate-limited RPC client
//!
//! [`RateLimiter`] admits at most `reservoir` calls per refresh interval, keeps at most
//! `max_concurrent` calls in flight, spaces dispatches by at least `min_time`, and turns a
//! server-side rate-limit signal into one delayed retry. [`RateLimitedRpc`] applies it to
//! every call of a wrapped [`ChainRpc`].

use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, Semaphore};
use tokio::time::{Duration, Instant, sleep};
use tracing::{debug, warn};

use crate::config::RateLimitConfig;
use crate::error::{Result, RpcError, SyncError};
use crate::rpc::ChainRpc;
use crate::types::{EventKind, GovernanceLog};

struct Bucket {
    tokens: u32,
    refilled_at: Instant,
    next_dispatch: Instant,
}

/// Snapshot of limiter counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterStats {
    pub dispatched: u64,
    pub rate_limited: u64,
    pub retried: u64,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    concurrency: Semaphore,
    bucket: Mutex<Bucket>,
    dispatched: AtomicU64,
    rate_limited: AtomicU64,
    retried: AtomicU64,
}

impl RateLimiter {
    /// Fails with [`SyncError::Configuration`] when `config` would stall or divide by zero
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        config.validate().map_err(SyncError::Configuration)?;

        let now = Instant::now();
        Ok(Self {
            concurrency: Semaphore::new(config.max_concurrent as usize),
            bucket: Mutex::new(Bucket {
                tokens: config.reservoir,
                refilled_at: now,
                next_dispatch: now,
            }),
            config,
            dispatched: AtomicU64::new(0),
            rate_limited: AtomicU64::new(0),
            retried: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            rate_limited: self.rate_limited.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
        }
    }

    /// Run `op` under the limiter
    ///
    /// A `RpcError::RateLimited` result is retried exactly once after the advised delay
    /// (or the configured default). Any other error is returned as is.
    pub async fn schedule<T, F, Fut>(&self, op: F) -> std::result::Result<T, RpcError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, RpcError>>,
    {
        match self.dispatch(&op).await {
            Err(RpcError::RateLimited { retry_after }) => {
                self.rate_limited.fetch_add(1, Ordering::Relaxed);
                let delay = retry_after.unwrap_or_else(|| self.config.default_retry_after());
                warn!("RPC endpoint rate limited us, retrying once in {:?}", delay);
                sleep(delay).await;

                self.retried.fetch_add(1, Ordering::Relaxed);
                let result = self.dispatch(&op).await;
                if let Err(RpcError::RateLimited { .. }) = &result {
                    self.rate_limited.fetch_add(1, Ordering::Relaxed);
                }
                result
            }
            other => other,
        }
    }

    async fn dispatch<T, F, Fut>(&self, op: &F) -> std::result::Result<T, RpcError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = std::result::Result<T, RpcError>>,
    {
        let _permit = self
            .concurrency
            .acquire()
            .await
            .map_err(|_| RpcError::LimiterClosed)?;
        self.take_token().await;
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        op().await
    }

    /// Wait until both a reservoir token and the minimum spacing are available
    async fn take_token(&self) {
        let interval = self.config.refresh_interval();
        let min_time = self.config.min_time();

        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();

                let elapsed = now.saturating_duration_since(bucket.refilled_at);
                if elapsed >= interval {
                    // Refills stay on the interval grid regardless of when we observe them
                    let periods = (elapsed.as_nanos() / interval.as_nanos()).min(u32::MAX as u128);
                    bucket.refilled_at += interval * periods as u32;
                    bucket.tokens = self.config.reservoir;
                }

                if bucket.tokens > 0 && now >= bucket.next_dispatch {
                    bucket.tokens -= 1;
                    bucket.next_dispatch = now + min_time;
                    return;
                }

                let ready_at = if bucket.tokens == 0 {
                    (bucket.refilled_at + interval).max(bucket.next_dispatch)
                } else {
                    bucket.next_dispatch
                };
                ready_at.saturating_duration_since(now)
            };

            debug!("Rate limiter waiting {:?} for a dispatch slot", wait);
            sleep(wait.max(Duration::from_millis(1))).await;
        }
    }
}

/// [`ChainRpc`] decorator routing every call through a [`RateLimiter`]
pub struct RateLimitedRpc<R> {
    inner: R,
    limiter: RateLimiter,
}

impl<R: ChainRpc> RateLimitedRpc<R> {
    pub fn new(inner: R, config: RateLimitConfig) -> Result<Self> {
        Ok(Self {
            inner,
            limiter: RateLimiter::new(config)?,
        })
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

#[async_trait]
impl<R: ChainRpc> ChainRpc for RateLimitedRpc<R> {
    async fn block_number(&self) -> std::result::Result<u64, RpcError> {
        self.limiter.schedule(|| self.inner.block_number()).await
    }

    async fn logs(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> std::result::Result<Vec<GovernanceLog>, RpcError> {
        self.limiter
            .schedule(|| self.inner.logs(kind, from_block, to_block))
            .await
    }

    fn limiter_stats(&self) -> Option<RateLimiterStats> {
        Some(self.limiter.stats())
    }
}
