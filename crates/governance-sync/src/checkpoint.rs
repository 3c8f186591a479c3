//! Per-stream block cursors
//!
//! A checkpoint is the next block a stream has not scanned yet. It only moves forward,
//! and callers advance it after the batch it covers has been persisted.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::GovernanceStore;
use crate::types::StreamKey;

pub struct CheckpointStore {
    store: Arc<dyn GovernanceStore>,
    genesis: HashMap<StreamKey, u64>,
}

impl CheckpointStore {
    pub fn new(store: Arc<dyn GovernanceStore>, genesis: HashMap<StreamKey, u64>) -> Self {
        Self { store, genesis }
    }

    /// Next block to scan for `stream`
    ///
    /// On first read the stream's genesis block is persisted and returned, so later reads
    /// see the same value.
    pub async fn get(&self, stream: StreamKey) -> Result<u64> {
        if let Some(block) = self.store.get_metadata(stream.as_str()).await? {
            return Ok(block);
        }

        let genesis = self.genesis.get(&stream).copied().unwrap_or(0);
        info!(
            "No checkpoint for {}, starting from genesis block {}",
            stream, genesis
        );
        self.store.put_metadata(stream.as_str(), genesis).await?;
        Ok(genesis)
    }

    /// Store `block` as the next block to scan; a value behind the current cursor is ignored
    pub async fn set(&self, stream: StreamKey, block: u64) -> Result<()> {
        if let Some(current) = self.store.get_metadata(stream.as_str()).await? {
            if block < current {
                warn!(
                    "Refusing to move {} checkpoint back from {} to {}",
                    stream, current, block
                );
                return Ok(());
            }
        }

        debug!("Advancing {} checkpoint to {}", stream, block);
        self.store.put_metadata(stream.as_str(), block).await
    }
}
