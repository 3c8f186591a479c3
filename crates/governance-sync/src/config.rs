//! Configuration types for the governance indexer

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::StreamKey;

/// Token-bucket settings for the RPC client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Calls admitted per refresh interval
    pub reservoir: u32,

    /// Interval after which the reservoir is topped back up to `reservoir`
    pub refresh_interval_ms: u64,

    /// Maximum calls in flight at once
    pub max_concurrent: u32,

    /// Minimum spacing between two dispatches
    pub min_time_ms: u64,

    /// Delay before the single retry when the server gives no hint
    pub default_retry_after_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            reservoir: 10,
            refresh_interval_ms: 1000,
            max_concurrent: 4,
            min_time_ms: 100,
            default_retry_after_ms: 1000,
        }
    }
}

impl RateLimitConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }

    pub fn min_time(&self) -> Duration {
        Duration::from_millis(self.min_time_ms)
    }

    pub fn default_retry_after(&self) -> Duration {
        Duration::from_millis(self.default_retry_after_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.reservoir == 0 {
            return Err("rate_limit.reservoir must be > 0".to_string());
        }

        if self.refresh_interval_ms == 0 {
            return Err("rate_limit.refresh_interval_ms must be > 0".to_string());
        }

        if self.max_concurrent == 0 {
            return Err("rate_limit.max_concurrent must be > 0".to_string());
        }

        if self.min_time_ms > self.refresh_interval_ms {
            return Err(
                "rate_limit.min_time_ms cannot exceed rate_limit.refresh_interval_ms".to_string(),
            );
        }

        if self.default_retry_after_ms > 300_000 {
            return Err("rate_limit.default_retry_after_ms too large (max 5 minutes)".to_string());
        }

        Ok(())
    }
}

/// Configuration for the governance indexer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// HTTP JSON-RPC endpoint of the chain hosting the governor contract
    pub rpc_url: String,

    /// Governor contract address (0x-prefixed, 42 characters)
    pub governor_address: String,

    /// Chain ID, used for logging only
    #[serde(default)]
    pub chain_id: u64,

    /// Store location: a sea-orm database URL, or "memory"
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Orchestrator directory endpoint (JSON array)
    pub directory_url: String,

    /// Regions reference endpoint (JSON array)
    #[serde(default)]
    pub regions_url: Option<String>,

    /// Pipelines reference endpoint (`{"pipelines": [...]}`)
    #[serde(default)]
    pub pipelines_url: Option<String>,

    /// Timeout for REST calls to the directory endpoints
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Seconds between ingestion cycles
    #[serde(default = "default_sync_interval_secs")]
    pub sync_interval_secs: u64,

    /// First block worth scanning for ProposalCreated
    #[serde(default)]
    pub proposal_genesis_block: u64,

    /// First block worth scanning for VoteCast
    #[serde(default)]
    pub vote_genesis_block: u64,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_database_url() -> String {
    "sqlite://governance.db?mode=rwc".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_sync_interval_secs() -> u64 {
    300
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://localhost:8545".to_string(),
            governor_address: String::new(),
            chain_id: 1337,
            database_url: default_database_url(),
            directory_url: String::new(),
            regions_url: None,
            pipelines_url: None,
            http_timeout_secs: default_http_timeout_secs(),
            sync_interval_secs: default_sync_interval_secs(),
            proposal_genesis_block: 0,
            vote_genesis_block: 0,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(toml: &str) -> Result<Self, anyhow::Error> {
        let config: Self = toml::from_str(toml)?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration validation failed: {}", e))?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// Returns `Ok(())` if valid, otherwise returns error message
    pub fn validate(&self) -> Result<(), String> {
        if self.rpc_url.is_empty() {
            return Err("rpc_url cannot be empty".to_string());
        }

        if !is_http_url(&self.rpc_url) {
            return Err("rpc_url must start with http:// or https://".to_string());
        }

        if self.governor_address.is_empty() {
            return Err("governor_address cannot be empty".to_string());
        }

        if !self.governor_address.starts_with("0x") {
            return Err("governor_address must start with 0x".to_string());
        }

        if self.governor_address.len() != 42 {
            return Err(format!(
                "governor_address must be 42 characters (0x + 40 hex), got {}",
                self.governor_address.len()
            ));
        }

        if !self.governor_address[2..]
            .chars()
            .all(|c| c.is_ascii_hexdigit())
        {
            return Err("governor_address must contain only hex characters after 0x".to_string());
        }

        if !is_http_url(&self.directory_url) {
            return Err("directory_url must start with http:// or https://".to_string());
        }

        for (name, url) in [
            ("regions_url", &self.regions_url),
            ("pipelines_url", &self.pipelines_url),
        ] {
            if let Some(url) = url {
                if !is_http_url(url) {
                    return Err(format!("{} must start with http:// or https://", name));
                }
            }
        }

        if self.database_url.is_empty() {
            return Err("database_url cannot be empty".to_string());
        }

        if self.sync_interval_secs == 0 {
            return Err("sync_interval_secs must be > 0".to_string());
        }

        if self.http_timeout_secs == 0 {
            return Err("http_timeout_secs must be > 0".to_string());
        }

        self.rate_limit.validate()
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    /// First block each stream starts from when it has never been checkpointed
    pub fn genesis_block(&self, stream: StreamKey) -> u64 {
        match stream {
            StreamKey::Proposals => self.proposal_genesis_block,
            StreamKey::Votes => self.vote_genesis_block,
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
