//! Subject storage for MediSync.
//!
//! Persists each subject's [`Envelope`](medisync_crypto::Envelope) and its
//! append-only list of encrypted [`RecordEntry`](medisync_crypto::RecordEntry)
//! values. Stores hold base64 ciphertext only; keys never reach this layer.
//!
//! The vault takes any [`SubjectStore`] at construction time, so callers can
//! plug in their own document store. Two implementations ship here:
//!
//! - [`MemorySubjectStore`] for tests and embedding
//! - [`DuckDbSubjectStore`] for on-disk persistence

mod duckdb_store;
mod error;
mod memory_store;
mod store;

pub use duckdb_store::DuckDbSubjectStore;
pub use error::{StorageError, StorageResult};
pub use memory_store::MemorySubjectStore;
pub use store::{StoredEntry, SubjectStore};

/// Open a DuckDB connection and apply resource limits.
///
/// A failed open is returned as is. The `.wal` file next to the database may
/// hold committed envelopes that were never checkpointed, so it is left in
/// place for an operator to inspect.
pub fn open_duckdb(
    path: &std::path::Path,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<duckdb::Connection> {
    let conn = duckdb::Connection::open(path).inspect_err(|e| {
        let wal = wal_path(path);
        if wal.exists() {
            tracing::error!(
                db = %path.display(),
                wal = %wal.display(),
                error = %e,
                "DuckDB open failed with a WAL present; WAL left untouched"
            );
        }
    })?;
    apply_resource_limits(&conn, memory_limit, threads)?;
    Ok(conn)
}

/// Path of the write-ahead log DuckDB keeps next to `path`.
pub fn wal_path(path: &std::path::Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".wal");
    std::path::PathBuf::from(name)
}

/// Apply memory and thread limits to a DuckDB connection.
fn apply_resource_limits(
    conn: &duckdb::Connection,
    memory_limit: &str,
    threads: u32,
) -> StorageResult<()> {
    conn.execute_batch(&format!(
        "PRAGMA memory_limit='{memory_limit}'; PRAGMA threads={threads};"
    ))?;
    Ok(())
}
