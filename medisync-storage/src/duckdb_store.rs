//! DuckDB-backed subject store.
//!
//! Envelopes live in `subjects`, one row per subject. Entries live in
//! `record_entries`, keyed by `(subject_id, seq)`; rows are only ever
//! inserted, never rewritten.

use crate::error::{StorageError, StorageResult};
use crate::store::{StoredEntry, SubjectStore};
use duckdb::{params, Connection};
use medisync_crypto::{Envelope, RecordEntry};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

#[derive(Clone)]
pub struct DuckDbSubjectStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbSubjectStore {
    /// Opens or creates a store at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = crate::open_duckdb(path, "128MB", 1)?;
        initialize_subject_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_subject_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn subject_exists(conn: &Connection, subject_id: &str) -> StorageResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM subjects WHERE subject_id = ?",
        params![subject_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl SubjectStore for DuckDbSubjectStore {
    fn get_envelope(&self, subject_id: &str) -> StorageResult<Option<Envelope>> {
        let conn = self.lock()?;
        let result = conn.query_row(
            "SELECT salt, wrapped_dek, wrap_nonce FROM subjects WHERE subject_id = ?",
            params![subject_id],
            |row| {
                Ok(Envelope {
                    salt: row.get(0)?,
                    wrapped_dek: row.get(1)?,
                    wrap_nonce: row.get(2)?,
                })
            },
        );
        match result {
            Ok(envelope) => Ok(Some(envelope)),
            Err(duckdb::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn insert_envelope(&self, subject_id: &str, envelope: &Envelope) -> StorageResult<()> {
        let conn = self.lock()?;
        if subject_exists(&conn, subject_id)? {
            return Err(StorageError::AlreadyExists(subject_id.to_string()));
        }
        let now = now_millis();
        conn.execute(
            r#"
            INSERT INTO subjects (
                subject_id, salt, wrapped_dek, wrap_nonce, created_at, modified_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                subject_id,
                envelope.salt,
                envelope.wrapped_dek,
                envelope.wrap_nonce,
                now,
                now,
            ],
        )?;
        debug!(subject_id, "stored subject envelope");
        Ok(())
    }

    fn update_envelope(&self, subject_id: &str, envelope: &Envelope) -> StorageResult<()> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE subjects SET salt = ?, wrapped_dek = ?, wrap_nonce = ?, modified_at = ? \
             WHERE subject_id = ?",
            params![
                envelope.salt,
                envelope.wrapped_dek,
                envelope.wrap_nonce,
                now_millis(),
                subject_id,
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::SubjectNotFound(subject_id.to_string()));
        }
        debug!(subject_id, "replaced subject envelope");
        Ok(())
    }

    fn append_entry(&self, subject_id: &str, entry: &RecordEntry) -> StorageResult<u64> {
        // Holding the connection lock across read-max and insert makes the
        // sequence allocation atomic for this store.
        let conn = self.lock()?;
        if !subject_exists(&conn, subject_id)? {
            return Err(StorageError::SubjectNotFound(subject_id.to_string()));
        }
        let next: i64 = conn.query_row(
            "SELECT COALESCE(MAX(seq) + 1, 0) FROM record_entries WHERE subject_id = ?",
            params![subject_id],
            |row| row.get(0),
        )?;
        conn.execute(
            r#"
            INSERT INTO record_entries (
                subject_id, seq, entry_id, ciphertext, entry_nonce, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                subject_id,
                next,
                uuid::Uuid::now_v7().to_string(),
                entry.ciphertext,
                entry.entry_nonce,
                now_millis(),
            ],
        )?;
        Ok(next as u64)
    }

    fn list_entries(&self, subject_id: &str) -> StorageResult<Vec<StoredEntry>> {
        let conn = self.lock()?;
        if !subject_exists(&conn, subject_id)? {
            return Err(StorageError::SubjectNotFound(subject_id.to_string()));
        }
        let mut stmt = conn.prepare(
            "SELECT seq, ciphertext, entry_nonce FROM record_entries \
             WHERE subject_id = ? ORDER BY seq",
        )?;
        let entries = stmt
            .query_map(params![subject_id], |row| {
                let seq: i64 = row.get(0)?;
                Ok(StoredEntry {
                    seq: seq as u64,
                    entry: RecordEntry {
                        ciphertext: row.get(1)?,
                        entry_nonce: row.get(2)?,
                    },
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn initialize_subject_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS subjects (
            subject_id VARCHAR PRIMARY KEY,
            salt VARCHAR NOT NULL,
            wrapped_dek VARCHAR NOT NULL,
            wrap_nonce VARCHAR NOT NULL,
            created_at BIGINT NOT NULL,
            modified_at BIGINT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS record_entries (
            subject_id VARCHAR NOT NULL,
            seq BIGINT NOT NULL,
            entry_id VARCHAR NOT NULL,
            ciphertext TEXT NOT NULL,
            entry_nonce VARCHAR NOT NULL,
            created_at BIGINT NOT NULL,
            PRIMARY KEY (subject_id, seq)
        );
        "#,
    )?;
    Ok(())
}
