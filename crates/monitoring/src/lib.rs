//! # Governance Indexer Monitoring
//!
//! Process-wide `tracing` setup shared by the indexer binary.
//!
//! ## Usage
//!
//! ```rust,no_run
//! fn main() -> anyhow::Result<()> {
//!     monitoring::init_logging()?;
//!     tracing::info!("indexer starting");
//!     Ok(())
//! }
//! ```

pub mod logging;

pub use logging::{LogDestination, LoggingConfig, init_cli_logging, init_logging, init_logging_with};
