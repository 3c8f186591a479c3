//! SQL persistence for the governance indexer
//!
//! [`SqlStore`] implements `governance_sync::GovernanceStore` over sea-orm. Any URL sea-orm
//! accepts works (`sqlite://governance.db?mode=rwc`, `sqlite::memory:`, `postgres://...`);
//! tables and indices are created on connect when missing.

pub mod entity;
pub mod error;
pub mod store;

pub use error::{DbError, Result};
pub use store::SqlStore;
