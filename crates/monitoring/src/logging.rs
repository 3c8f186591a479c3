//! Logging configuration and initialization
//!
//! - Console logging (default) or daily rotating files
//! - Configurable log directory and file prefix
//! - `RUST_LOG` filtering, defaulting to `info`

use anyhow::{Result, anyhow};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_LOG_FILE_PREFIX: &str = "governance-indexer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDestination {
    Console,
    File,
}

impl LogDestination {
    /// Parse `LOG_DESTINATION`; anything other than "file" means console
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("file") {
            Self::File
        } else {
            Self::Console
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub destination: LogDestination,
    pub log_dir: PathBuf,
    pub file_prefix: String,
}

impl LoggingConfig {
    /// Read `LOG_DESTINATION`, `LOG_DIR` and `LOG_FILE_PREFIX`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            destination: lookup("LOG_DESTINATION")
                .map(|v| LogDestination::parse(&v))
                .unwrap_or(LogDestination::Console),
            log_dir: lookup("LOG_DIR")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())
                .into(),
            file_prefix: lookup("LOG_FILE_PREFIX")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILE_PREFIX.to_string()),
        }
    }
}

/// Initialize tracing from the environment
///
/// ## Environment Variables
///
/// - `LOG_DESTINATION`: "console" or "file" (default: "console")
/// - `LOG_DIR`: directory for log files (default: "./logs"), file destination only
/// - `LOG_FILE_PREFIX`: log file name prefix (default: "governance-indexer"), file destination only
/// - `RUST_LOG`: filter directives (default: "info")
pub fn init_logging() -> Result<()> {
    init_logging_with(&LoggingConfig::from_env())
}

/// Initialize tracing with an explicit configuration
///
/// Fails if the log directory cannot be created or a global subscriber is already set.
pub fn init_logging_with(config: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match config.destination {
        LogDestination::Console => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stdout)
                        .with_ansi(true)
                        .with_target(false),
                )
                .try_init()
                .map_err(|e| anyhow!("Failed to initialize console tracing subscriber: {}", e))?;

            info!("Logging to console (stdout)");
        }
        LogDestination::File => {
            std::fs::create_dir_all(&config.log_dir).map_err(|e| {
                anyhow!(
                    "Failed to create log directory '{}': {}",
                    config.log_dir.display(),
                    e
                )
            })?;

            let file_appender = rolling::daily(&config.log_dir, &config.file_prefix);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_ansi(false)
                        .with_target(false),
                )
                .try_init()
                .map_err(|e| anyhow!("Failed to initialize file tracing subscriber: {}", e))?;

            info!(
                "Logging to daily rotating files: {}/{}.<YYYY-MM-DD>",
                config.log_dir.display(),
                config.file_prefix
            );

            // The writer thread lives as long as the guard; keep it for the whole process
            std::mem::forget(guard);
        }
    }

    Ok(())
}

/// Minimal logging for one-shot read commands: warnings and errors to stderr, so stdout
/// stays clean for command output
pub fn init_cli_logging() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize CLI tracing subscriber: {}", e))
}
