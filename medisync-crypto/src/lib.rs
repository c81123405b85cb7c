//! Per-subject envelope encryption for MediSync.
//!
//! Provides record-level encryption using:
//! - PBKDF2-HMAC-SHA256 for key derivation from the subject identifier
//! - AES-256-GCM for authenticated encryption
//! - Key material that zeroizes on drop
//!
//! # Architecture
//!
//! The encryption uses a two-tier key system:
//!
//! 1. **Key-Encryption Key (KEK)**: Derived from the subject identifier and a
//!    random per-subject salt. The KEK is never stored - it is derived each
//!    time the subject's records are read or written.
//!
//! 2. **Data-Encryption Key (DEK)**: A random key generated once per subject.
//!    The DEK is wrapped with the KEK and stored as an [`Envelope`] alongside
//!    the subject.
//!
//! Each record entry is encrypted independently under the DEK with its own
//! nonce, so appending entry N+1 never touches entries 1..N.
//!
//! # Authorization
//!
//! Nothing in this crate takes a caller identity or role. Callers decide
//! who may read or write a subject's records before calling in; this layer
//! only derives keys and encrypts.

mod cipher;
mod encoding;
pub mod envelope;
mod error;
mod key;
pub mod record;

pub use cipher::{decrypt, encrypt, encrypt_with_nonce, EncryptedData, NONCE_SIZE, TAG_SIZE};
pub use encoding::{decode_field, encode};
pub use envelope::{provision, provision_with, rewrap, unwrap, unwrap_with, Envelope};
pub use error::{AuthenticationError, CryptoError, CryptoResult};
pub use key::{
    derive_kek, generate_dek, Dek, KdfParams, Kek, KekDeriver, Salt, DEFAULT_ITERATIONS,
    KEY_SIZE, MIN_ITERATIONS, SALT_SIZE,
};
pub use record::{decrypt_entries, decrypt_entry, encrypt_entry, RecordEntry};
