//! Error types for the SQL store

use governance_sync::SyncError;
use sea_orm::DbErr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    /// Connection, query or constraint failure
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// A stored value the domain types cannot represent
    #[error("Invalid stored value: {0}")]
    InvalidValue(String),
}

impl From<DbError> for SyncError {
    fn from(err: DbError) -> Self {
        SyncError::Store(err.to_string())
    }
}

/// Shorthand for `map_err` on sea-orm calls inside `GovernanceStore` methods
pub(crate) fn store_err(err: DbErr) -> SyncError {
    DbError::from(err).into()
}
