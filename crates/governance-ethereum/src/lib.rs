//! Chain and directory adapters for the governance indexer
//!
//! - [`AlloyGovernorRpc`] implements `ChainRpc` against a governor contract over JSON-RPC
//! - [`HttpDirectory`] implements `DirectorySource` against the orchestrator REST endpoints

pub mod abi;
pub mod directory;
pub mod rpc;

pub use directory::HttpDirectory;
pub use rpc::{AlloyGovernorRpc, classify_transport_error};
