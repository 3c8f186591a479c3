//! Orchestrator directory sync
//!
//! The directory is an external REST endpoint returning every orchestrator. Each cycle
//! fetches the full list and upserts it by address; records absent from a refresh are
//! left as they were.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::store::GovernanceStore;
use crate::types::{Orchestrator, normalize_address};

/// External REST data providers
#[async_trait]
pub trait DirectorySource: Send + Sync {
    /// Full orchestrator list, one JSON object per entry
    async fn orchestrators(&self) -> Result<Vec<Value>>;

    /// Region reference data (flat array)
    async fn regions(&self) -> Result<Vec<Value>>;

    /// Pipeline reference data, unwrapped from `{"pipelines": [...]}`
    async fn pipelines(&self) -> Result<Vec<Value>>;
}

/// Directory entry as served by the endpoint; every field is optional and loosely typed
#[derive(Debug, Default, Deserialize)]
struct DirectoryEntry {
    eth_address: Option<String>,
    total_stake: Option<Value>,
    reward_cut: Option<Value>,
    fee_cut: Option<Value>,
    activation_status: Option<Value>,
    name: Option<String>,
    service_uri: Option<String>,
    avatar: Option<String>,
}

/// Outcome of one directory sync
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DirectorySyncReport {
    pub received: usize,
    pub upserted: usize,
    pub skipped: usize,
}

pub struct DirectorySync {
    source: Arc<dyn DirectorySource>,
    store: Arc<dyn GovernanceStore>,
}

impl DirectorySync {
    pub fn new(source: Arc<dyn DirectorySource>, store: Arc<dyn GovernanceStore>) -> Self {
        Self { source, store }
    }

    /// Fetch the directory and upsert every well-formed entry
    pub async fn sync(&self) -> Result<DirectorySyncReport> {
        let entries = self.source.orchestrators().await?;
        let mut report = DirectorySyncReport {
            received: entries.len(),
            ..Default::default()
        };

        let mut orchestrators = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match normalize_entry(entry) {
                Some(orchestrator) => orchestrators.push(orchestrator),
                None => {
                    warn!("Skipping directory entry {} without a usable eth_address", index);
                    report.skipped += 1;
                }
            }
        }

        report.upserted = orchestrators.len();
        if !orchestrators.is_empty() {
            self.store.upsert_orchestrators(orchestrators).await?;
        }

        info!(
            "Directory sync: {} received, {} upserted, {} skipped",
            report.received, report.upserted, report.skipped
        );
        Ok(report)
    }
}

/// Normalize one raw entry; `None` when it has no address
pub fn normalize_entry(entry: Value) -> Option<Orchestrator> {
    let entry: DirectoryEntry = match serde_json::from_value(entry) {
        Ok(entry) => entry,
        Err(e) => {
            debug!("Malformed directory entry: {}", e);
            return None;
        }
    };

    let address = entry
        .eth_address
        .as_deref()
        .map(normalize_address)
        .filter(|a| !a.is_empty())?;

    Some(Orchestrator {
        address,
        name: entry.name.unwrap_or_default(),
        avatar: entry.avatar.unwrap_or_default(),
        total_stake: coerce_number(entry.total_stake.as_ref()),
        reward_cut: coerce_number(entry.reward_cut.as_ref()),
        fee_cut: coerce_number(entry.fee_cut.as_ref()),
        active: coerce_bool(entry.activation_status.as_ref()),
        service_uri: entry.service_uri.unwrap_or_default(),
    })
}

fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        _ => 0.0,
    }
}

fn coerce_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        Some(Value::String(s)) => {
            matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "active")
        }
        _ => false,
    }
}
