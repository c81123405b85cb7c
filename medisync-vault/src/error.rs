//! Vault error types.

use medisync_crypto::CryptoError;
use medisync_storage::StorageError;
use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("subject not found: {0}")]
    SubjectNotFound(String),

    #[error("subject already provisioned: {0}")]
    AlreadyProvisioned(String),

    /// Key derivation or AEAD failure. `CryptoError::EnvelopeCorrupt` here
    /// means the subject's records are unreachable and needs an operator.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("record entry {seq} could not be decrypted")]
    EntryUnreadable {
        seq: u64,
        #[source]
        source: CryptoError,
    },

    #[error("storage error: {0}")]
    Storage(StorageError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("blocking task failed: {0}")]
    Task(String),
}

impl From<StorageError> for VaultError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::SubjectNotFound(id) => Self::SubjectNotFound(id),
            StorageError::AlreadyExists(id) => Self::AlreadyProvisioned(id),
            other => Self::Storage(other),
        }
    }
}

impl From<tokio::task::JoinError> for VaultError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}
