//! Shared fakes for ingestion tests

#![allow(dead_code)]

use alloy::primitives::U256;
use async_trait::async_trait;
use governance_sync::*;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const GENESIS: u64 = 100;
pub const ALICE: &str = "0x00000000000000000000000000000000000000a1";
pub const BOB: &str = "0x00000000000000000000000000000000000000b2";
pub const CAROL: &str = "0x00000000000000000000000000000000000000c3";

/// Scripted chain: a fixed set of logs and a movable head
#[derive(Default)]
pub struct FakeRpc {
    head: AtomicU64,
    logs: Mutex<Vec<GovernanceLog>>,
    fail_logs: AtomicBool,
    rate_limit_next: AtomicUsize,
    log_calls: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl FakeRpc {
    pub fn new(head: u64) -> Self {
        let rpc = Self::default();
        rpc.set_head(head);
        rpc
    }

    pub fn set_head(&self, head: u64) {
        self.head.store(head, Ordering::SeqCst);
    }

    pub fn push(&self, log: GovernanceLog) {
        self.logs.lock().unwrap().push(log);
    }

    pub fn fail_logs(&self, fail: bool) {
        self.fail_logs.store(fail, Ordering::SeqCst);
    }

    /// Answer the next `n` log queries with a rate-limit signal
    pub fn rate_limit_next(&self, n: usize) {
        self.rate_limit_next.store(n, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn log_calls(&self) -> usize {
        self.log_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainRpc for FakeRpc {
    async fn block_number(&self) -> std::result::Result<u64, RpcError> {
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn logs(
        &self,
        kind: EventKind,
        from_block: u64,
        to_block: u64,
    ) -> std::result::Result<Vec<GovernanceLog>, RpcError> {
        self.log_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self
            .rate_limit_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(RpcError::RateLimited {
                retry_after: Some(Duration::from_millis(10)),
            });
        }

        if self.fail_logs.load(Ordering::SeqCst) {
            return Err(RpcError::Transport("connection reset by peer".to_string()));
        }

        let mut logs: Vec<GovernanceLog> = self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|log| log.kind() == kind)
            .filter(|log| (from_block..=to_block).contains(&log.block_number()))
            .cloned()
            .collect();
        logs.sort_by_key(|log| log.block_number());
        Ok(logs)
    }
}

/// Scripted orchestrator directory
#[derive(Default)]
pub struct FakeDirectory {
    entries: Mutex<Vec<Value>>,
    fail: AtomicBool,
}

impl FakeDirectory {
    pub fn new(entries: Vec<Value>) -> Self {
        Self {
            entries: Mutex::new(entries),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_entries(&self, entries: Vec<Value>) {
        *self.entries.lock().unwrap() = entries;
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DirectorySource for FakeDirectory {
    async fn orchestrators(&self) -> governance_sync::Result<Vec<Value>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SyncError::Directory("502 Bad Gateway".to_string()));
        }
        Ok(self.entries.lock().unwrap().clone())
    }

    async fn regions(&self) -> governance_sync::Result<Vec<Value>> {
        Ok(vec![json!({ "id": "FRA", "name": "Frankfurt" })])
    }

    async fn pipelines(&self) -> governance_sync::Result<Vec<Value>> {
        Ok(vec![json!({ "id": "text-to-image", "models": ["sdxl"] })])
    }
}

/// MemoryStore with switchable write failures
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    pub fail_add_votes: AtomicBool,
    pub fail_update_stake: AtomicBool,
    pub fail_add_proposal: AtomicBool,
}

#[async_trait]
impl GovernanceStore for FlakyStore {
    async fn upsert_orchestrators(
        &self,
        orchestrators: Vec<Orchestrator>,
    ) -> governance_sync::Result<()> {
        self.inner.upsert_orchestrators(orchestrators).await
    }

    async fn get_orchestrator(
        &self,
        address: &str,
    ) -> governance_sync::Result<Option<Orchestrator>> {
        self.inner.get_orchestrator(address).await
    }

    async fn get_orchestrators(
        &self,
        addresses: &[String],
    ) -> governance_sync::Result<HashMap<String, Orchestrator>> {
        self.inner.get_orchestrators(addresses).await
    }

    async fn list_orchestrators(&self) -> governance_sync::Result<Vec<Orchestrator>> {
        self.inner.list_orchestrators().await
    }

    async fn get_proposal(&self, id: &str) -> governance_sync::Result<Option<Proposal>> {
        self.inner.get_proposal(id).await
    }

    async fn add_proposal(&self, proposal: Proposal) -> governance_sync::Result<()> {
        if self.fail_add_proposal.load(Ordering::SeqCst) {
            return Err(SyncError::Store("proposals table is locked".to_string()));
        }
        self.inner.add_proposal(proposal).await
    }

    async fn update_proposal_stake(
        &self,
        id: &str,
        total_stake_voted: f64,
    ) -> governance_sync::Result<()> {
        if self.fail_update_stake.load(Ordering::SeqCst) {
            return Err(SyncError::Store("update rejected".to_string()));
        }
        self.inner.update_proposal_stake(id, total_stake_voted).await
    }

    async fn list_proposals(&self) -> governance_sync::Result<Vec<Proposal>> {
        self.inner.list_proposals().await
    }

    async fn add_votes(&self, votes: Vec<Vote>) -> governance_sync::Result<()> {
        if self.fail_add_votes.load(Ordering::SeqCst) {
            return Err(SyncError::Store("bulk insert aborted".to_string()));
        }
        self.inner.add_votes(votes).await
    }

    async fn votes_for_proposal(&self, proposal_id: &str) -> governance_sync::Result<Vec<Vote>> {
        self.inner.votes_for_proposal(proposal_id).await
    }

    async fn list_votes(&self) -> governance_sync::Result<Vec<Vote>> {
        self.inner.list_votes().await
    }

    async fn get_metadata(&self, key: &str) -> governance_sync::Result<Option<u64>> {
        self.inner.get_metadata(key).await
    }

    async fn put_metadata(&self, key: &str, value: u64) -> governance_sync::Result<()> {
        self.inner.put_metadata(key, value).await
    }
}

pub fn proposal_created(block: u64, id: &str, proposer: &str, description: &str) -> GovernanceLog {
    GovernanceLog::ProposalCreated(ProposalCreatedLog {
        block_number: block,
        proposal_id: Some(id.to_string()),
        proposer: proposer.to_string(),
        description: description.to_string(),
        block_timestamp: Some(1_700_000_000 + block),
    })
}

pub fn vote_cast(block: u64, id: &str, voter: &str, support: u8, weight: u128) -> GovernanceLog {
    GovernanceLog::VoteCast(VoteCastLog {
        block_number: block,
        voter: voter.to_string(),
        proposal_id: Some(id.to_string()),
        support,
        weight: U256::from(weight),
        block_timestamp: Some(1_700_000_000 + block),
    })
}

pub fn directory_entry(address: &str, name: &str, stake: f64) -> Value {
    json!({
        "eth_address": address,
        "total_stake": stake,
        "reward_cut": 0.1,
        "fee_cut": 0.25,
        "activation_status": true,
        "name": name,
        "service_uri": "https://orch.example.com:8935",
        "avatar": format!("ipfs://{}", name),
    })
}

/// Components wired against a scripted chain and directory
pub struct Harness<S: GovernanceStore + 'static> {
    pub rpc: Arc<FakeRpc>,
    pub directory: Arc<FakeDirectory>,
    pub store: Arc<S>,
    pub checkpoints: Arc<CheckpointStore>,
    pub fetcher: Arc<EventFetcher>,
}

impl<S: GovernanceStore + 'static> Harness<S> {
    pub fn with_store(store: S, head: u64) -> Self {
        let rpc = Arc::new(FakeRpc::new(head));
        let directory = Arc::new(FakeDirectory::default());
        let store = Arc::new(store);
        let checkpoints = Arc::new(CheckpointStore::new(
            store.clone(),
            HashMap::from([(StreamKey::Proposals, GENESIS), (StreamKey::Votes, GENESIS)]),
        ));
        let fetcher = Arc::new(EventFetcher::new(rpc.clone()));

        Self {
            rpc,
            directory,
            store,
            checkpoints,
            fetcher,
        }
    }

    pub fn proposals(&self) -> ProposalIngestor {
        ProposalIngestor::new(
            self.fetcher.clone(),
            self.store.clone(),
            self.checkpoints.clone(),
        )
    }

    pub fn votes(&self) -> VoteIngestor {
        VoteIngestor::new(
            self.fetcher.clone(),
            self.store.clone(),
            self.checkpoints.clone(),
        )
    }

    pub fn directory_sync(&self) -> DirectorySync {
        DirectorySync::new(self.directory.clone(), self.store.clone())
    }

    pub fn pipeline(&self) -> SyncPipeline {
        SyncPipeline::new(
            self.rpc.clone(),
            self.directory.clone(),
            self.store.clone(),
            HashMap::from([(StreamKey::Proposals, GENESIS), (StreamKey::Votes, GENESIS)]),
        )
    }

    pub fn query(&self) -> GovernanceQuery {
        GovernanceQuery::new(self.store.clone(), Some(self.directory.clone()))
    }

    pub async fn checkpoint(&self, stream: StreamKey) -> Option<u64> {
        self.store.get_metadata(stream.as_str()).await.unwrap()
    }
}

impl Harness<MemoryStore> {
    pub fn new(head: u64) -> Self {
        Self::with_store(MemoryStore::new(), head)
    }
}
