//! Encrypted record vault for MediSync.
//!
//! Ties the per-subject envelope scheme of `medisync-crypto` to an injected
//! [`SubjectStore`](medisync_storage::SubjectStore):
//!
//! - [`RecordVault::onboard`] provisions a subject once
//! - [`RecordVault::append_entry`] encrypts and appends one record entry
//! - [`RecordVault::read_history`] decrypts a subject's entries one by one
//! - [`RecordVault::rewrap_subject`] moves a subject to new KDF settings
//!
//! KEK derivation is deliberately slow. From async code use the `*_async`
//! variants, which run on tokio's blocking pool.
//!
//! The vault performs no authorization. Callers check roles first and pass
//! in only subject ids and plaintext.

mod audit;
mod config;
mod error;
mod vault;

pub use audit::{AuditAction, AuditEvent, AuditSink, TracingAuditSink};
pub use config::{VaultConfig, ENV_KDF_ITERATIONS, ENV_KDF_PEPPER};
pub use error::{VaultError, VaultResult};
pub use vault::{DecryptedEntry, RecordVault};
