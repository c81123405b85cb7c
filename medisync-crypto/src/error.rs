//! Error types for the encryption layer.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// AEAD tag verification failed.
///
/// Deliberately carries no detail: a wrong key, a wrong nonce and corrupted
/// ciphertext all look the same to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("authentication failed")]
pub struct AuthenticationError;

/// Errors that can occur during key derivation, encryption or decryption.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Malformed key, nonce, salt or encoded field. A caller bug; not retryable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A ciphertext did not verify under the given key and nonce.
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    /// The subject's wrapped DEK could not be opened.
    ///
    /// Either the stored envelope is corrupt or malformed, or it belongs to a different
    /// subject identifier. The subject's records are inaccessible until the
    /// underlying cause is fixed.
    #[error("envelope corrupt: data key could not be unwrapped")]
    EnvelopeCorrupt(#[source] AuthenticationError),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("random number generation failed: {0}")]
    Rng(String),
}

impl CryptoError {
    /// True for tag failures, whether on a record entry or on the envelope.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::EnvelopeCorrupt(_))
    }
}
