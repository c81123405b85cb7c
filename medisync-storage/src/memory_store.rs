//! In-memory subject store, for tests and embedding.

use crate::error::{StorageError, StorageResult};
use crate::store::{StoredEntry, SubjectStore};
use medisync_crypto::{Envelope, RecordEntry};
use std::collections::HashMap;
use std::sync::RwLock;

struct SubjectRecord {
    envelope: Envelope,
    entries: Vec<RecordEntry>,
}

#[derive(Default)]
pub struct MemorySubjectStore {
    subjects: RwLock<HashMap<String, SubjectRecord>>,
}

impl MemorySubjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of provisioned subjects.
    pub fn subject_count(&self) -> StorageResult<usize> {
        let subjects = self.subjects.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(subjects.len())
    }
}

impl SubjectStore for MemorySubjectStore {
    fn get_envelope(&self, subject_id: &str) -> StorageResult<Option<Envelope>> {
        let subjects = self.subjects.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(subjects.get(subject_id).map(|s| s.envelope.clone()))
    }

    fn insert_envelope(&self, subject_id: &str, envelope: &Envelope) -> StorageResult<()> {
        let mut subjects = self.subjects.write().map_err(|_| StorageError::LockPoisoned)?;
        if subjects.contains_key(subject_id) {
            return Err(StorageError::AlreadyExists(subject_id.to_string()));
        }
        subjects.insert(
            subject_id.to_string(),
            SubjectRecord {
                envelope: envelope.clone(),
                entries: Vec::new(),
            },
        );
        Ok(())
    }

    fn update_envelope(&self, subject_id: &str, envelope: &Envelope) -> StorageResult<()> {
        let mut subjects = self.subjects.write().map_err(|_| StorageError::LockPoisoned)?;
        let record = subjects
            .get_mut(subject_id)
            .ok_or_else(|| StorageError::SubjectNotFound(subject_id.to_string()))?;
        record.envelope = envelope.clone();
        Ok(())
    }

    fn append_entry(&self, subject_id: &str, entry: &RecordEntry) -> StorageResult<u64> {
        let mut subjects = self.subjects.write().map_err(|_| StorageError::LockPoisoned)?;
        let record = subjects
            .get_mut(subject_id)
            .ok_or_else(|| StorageError::SubjectNotFound(subject_id.to_string()))?;
        record.entries.push(entry.clone());
        Ok(record.entries.len() as u64 - 1)
    }

    fn list_entries(&self, subject_id: &str) -> StorageResult<Vec<StoredEntry>> {
        let subjects = self.subjects.read().map_err(|_| StorageError::LockPoisoned)?;
        let record = subjects
            .get(subject_id)
            .ok_or_else(|| StorageError::SubjectNotFound(subject_id.to_string()))?;
        Ok(record
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| StoredEntry {
                seq: i as u64,
                entry: entry.clone(),
            })
            .collect())
    }
}
