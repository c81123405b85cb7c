//! Storage error types.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("subject not found: {0}")]
    SubjectNotFound(String),

    #[error("subject already provisioned: {0}")]
    AlreadyExists(String),

    #[error("database error: {0}")]
    Database(#[from] duckdb::Error),

    #[error("storage lock poisoned")]
    LockPoisoned,
}
