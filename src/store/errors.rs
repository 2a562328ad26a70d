//! Store error types

use thiserror::Error;

/// Failures raised by a key-value store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown database '{0}'")]
    UnknownDatabase(String),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("mutation for database '{found}' committed against '{expected}'")]
    DatabaseMismatch { expected: String, found: String },

    #[error("store is read-only")]
    ReadOnly,

    #[error("malformed store dump: {0}")]
    MalformedDump(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
