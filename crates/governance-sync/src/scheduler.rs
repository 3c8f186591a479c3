//! Ingestion cycle and its fixed-interval scheduler
//!
//! One cycle runs directory sync, proposal ingest and vote ingest in that order, all
//! bounded by a single head-block snapshot. Cycles never overlap: a trigger that arrives
//! while one is running is dropped.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, warn};

use crate::checkpoint::CheckpointStore;
use crate::config::IndexerConfig;
use crate::directory::{DirectorySource, DirectorySync, DirectorySyncReport};
use crate::fetcher::EventFetcher;
use crate::proposals::{ProposalIngestReport, ProposalIngestor};
use crate::rate_limit::RateLimiterStats;
use crate::rpc::ChainRpc;
use crate::store::GovernanceStore;
use crate::types::StreamKey;
use crate::votes::{VoteIngestReport, VoteIngestor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Directory,
    Head,
    Proposals,
    Votes,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Directory => "directory",
            Self::Head => "head",
            Self::Proposals => "proposals",
            Self::Votes => "votes",
        };
        f.write_str(name)
    }
}

/// What one cycle did
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub head_block: Option<u64>,
    pub directory: Option<DirectorySyncReport>,
    pub proposals: Option<ProposalIngestReport>,
    pub votes: Option<VoteIngestReport>,
    /// Limiter counters since startup, taken when the cycle ends
    pub rpc_stats: Option<RateLimiterStats>,
    pub errors: Vec<(Phase, String)>,
}

impl CycleReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The three ingestion phases wired to one store
pub struct SyncPipeline {
    directory: DirectorySync,
    fetcher: Arc<EventFetcher>,
    proposals: ProposalIngestor,
    votes: VoteIngestor,
    checkpoints: Arc<CheckpointStore>,
}

impl SyncPipeline {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        source: Arc<dyn DirectorySource>,
        store: Arc<dyn GovernanceStore>,
        genesis: HashMap<StreamKey, u64>,
    ) -> Self {
        let fetcher = Arc::new(EventFetcher::new(rpc));
        let checkpoints = Arc::new(CheckpointStore::new(store.clone(), genesis));

        Self {
            directory: DirectorySync::new(source, store.clone()),
            proposals: ProposalIngestor::new(fetcher.clone(), store.clone(), checkpoints.clone()),
            votes: VoteIngestor::new(fetcher.clone(), store, checkpoints.clone()),
            fetcher,
            checkpoints,
        }
    }

    /// Build a pipeline using the genesis blocks from `config`
    pub fn from_config(
        config: &IndexerConfig,
        rpc: Arc<dyn ChainRpc>,
        source: Arc<dyn DirectorySource>,
        store: Arc<dyn GovernanceStore>,
    ) -> Self {
        let genesis = StreamKey::ALL
            .into_iter()
            .map(|stream| (stream, config.genesis_block(stream)))
            .collect();
        Self::new(rpc, source, store, genesis)
    }

    pub fn checkpoints(&self) -> &Arc<CheckpointStore> {
        &self.checkpoints
    }

    async fn run(&self, cycle: u64) -> CycleReport {
        let report = CycleReport {
            cycle,
            started_at: Utc::now(),
            head_block: None,
            directory: None,
            proposals: None,
            votes: None,
            rpc_stats: None,
            errors: Vec::new(),
        };
        let mut report = self.run_phases(cycle, report).await;
        report.rpc_stats = self.fetcher.limiter_stats();
        report
    }

    async fn run_phases(&self, cycle: u64, mut report: CycleReport) -> CycleReport {
        // The head is snapshotted before any phase runs; blocks mined during the cycle
        // belong to the next one
        let head = self.fetcher.head_block().await;

        // Stale display snapshots are acceptable, so a directory failure does not stop ingestion
        match self.directory.sync().await {
            Ok(directory) => report.directory = Some(directory),
            Err(e) => {
                error!("Cycle {}: directory sync failed: {}", cycle, e);
                report.errors.push((Phase::Directory, e.to_string()));
            }
        }

        let head = match head {
            Ok(head) => head,
            Err(e) => {
                error!("Cycle {}: failed to read head block: {}", cycle, e);
                report.errors.push((Phase::Head, e.to_string()));
                return report;
            }
        };
        report.head_block = Some(head);
        debug!("Cycle {}: head block snapshot {}", cycle, head);

        // Votes for proposals missing from the store would be dropped for good, so a
        // failed proposal phase ends the cycle here
        match self.proposals.ingest(head).await {
            Ok(proposals) => report.proposals = Some(proposals),
            Err(e) => {
                error!("Cycle {}: proposal ingest failed: {}", cycle, e);
                report.errors.push((Phase::Proposals, e.to_string()));
                return report;
            }
        }

        match self.votes.ingest(head).await {
            Ok(votes) => report.votes = Some(votes),
            Err(e) => {
                error!("Cycle {}: vote ingest failed: {}", cycle, e);
                report.errors.push((Phase::Votes, e.to_string()));
            }
        }

        report
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

pub struct Scheduler {
    pipeline: SyncPipeline,
    period: Duration,
    running: AtomicBool,
    cycles: AtomicU64,
}

/// Flips the scheduler back to idle however the cycle ends
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Scheduler {
    pub fn new(pipeline: SyncPipeline, period: Duration) -> Self {
        Self {
            pipeline,
            period,
            running: AtomicBool::new(false),
            cycles: AtomicU64::new(0),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.running.load(Ordering::Acquire) {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    pub fn pipeline(&self) -> &SyncPipeline {
        &self.pipeline
    }

    /// Run one cycle now
    ///
    /// Returns `None` without doing anything if a cycle is already running.
    pub async fn run_cycle(&self) -> Option<CycleReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Ingestion cycle still running, dropping this trigger");
            return None;
        }
        let _guard = RunningGuard(&self.running);

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        info!("Starting ingestion cycle {}", cycle);
        let report = self.pipeline.run(cycle).await;

        if let Some(stats) = &report.rpc_stats {
            info!(
                "Cycle {}: RPC calls dispatched {}, rate limited {}, retried {}",
                cycle, stats.dispatched, stats.rate_limited, stats.retried
            );
        }
        if report.is_success() {
            info!(
                "Ingestion cycle {} finished at head {:?}",
                cycle, report.head_block
            );
        } else {
            warn!(
                "Ingestion cycle {} finished with {} failed phase(s)",
                cycle,
                report.errors.len()
            );
        }
        Some(report)
    }

    /// Run a cycle immediately, then every `period`, until `shutdown` resolves
    ///
    /// A cycle in progress when `shutdown` fires runs to completion first.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!("Scheduler started, interval {:?}", self.period);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, scheduler stopping");
                    break;
                }
            }
        }
    }
}
