//! The storage interface the vault is constructed with.

use crate::error::StorageResult;
use medisync_crypto::{Envelope, RecordEntry};

/// A record entry as persisted, with its position in the subject's history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    /// Zero-based, dense, in append order.
    pub seq: u64,
    pub entry: RecordEntry,
}

/// Persistence for subject envelopes and their encrypted record entries.
///
/// Implementations only ever see encoded ciphertext; they never hold keys.
/// Appends must be serialised per subject inside the implementation so that
/// two concurrent appends cannot lose an entry.
pub trait SubjectStore: Send + Sync {
    /// Returns the subject's envelope, or `None` if it was never provisioned.
    fn get_envelope(&self, subject_id: &str) -> StorageResult<Option<Envelope>>;

    /// Stores the envelope for a new subject.
    ///
    /// Fails with `AlreadyExists` if the subject already has one.
    fn insert_envelope(&self, subject_id: &str, envelope: &Envelope) -> StorageResult<()>;

    /// Replaces an existing subject's envelope.
    fn update_envelope(&self, subject_id: &str, envelope: &Envelope) -> StorageResult<()>;

    /// Appends one entry and returns its sequence number.
    ///
    /// Fails with `SubjectNotFound` if the subject has no envelope.
    fn append_entry(&self, subject_id: &str, entry: &RecordEntry) -> StorageResult<u64>;

    /// Lists a subject's entries ordered by sequence number.
    ///
    /// Fails with `SubjectNotFound` for a subject that was never provisioned.
    fn list_entries(&self, subject_id: &str) -> StorageResult<Vec<StoredEntry>>;
}
