use thiserror::Error;
use vsp_types::FeeStatus;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("stale write: expected revision {expected}, found {found}")]
    Conflict { expected: u64, found: u64 },

    #[error("illegal fee status transition {from} -> {to}")]
    InvalidTransition { from: FeeStatus, to: FeeStatus },

    #[error("immutable field changed: {0}")]
    Immutable(&'static str),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("database is corrupted: {0}")]
    Corruption(String),
}
