//! Record vault: the orchestration request handlers call into.
//!
//! Every operation re-derives the subject's KEK, unwraps the DEK, does its
//! work and drops both keys before returning. Nothing is cached between
//! calls.

use crate::audit::{AuditAction, AuditEvent, AuditSink, TracingAuditSink};
use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use medisync_crypto::{
    decrypt_entry, encrypt_entry, provision_with, rewrap, unwrap_with, CryptoError, CryptoResult,
    Dek, Envelope, KekDeriver,
};
use medisync_storage::SubjectStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};
use zeroize::Zeroizing;

/// One slot of a history read.
pub struct DecryptedEntry {
    pub seq: u64,
    pub content: CryptoResult<Zeroizing<String>>,
}

impl DecryptedEntry {
    /// The plaintext, if this entry decrypted.
    pub fn text(&self) -> Option<&str> {
        self.content.as_ref().ok().map(|s| s.as_str())
    }
}

impl fmt::Debug for DecryptedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let content = match &self.content {
            Ok(_) => "Ok([REDACTED])".to_string(),
            Err(e) => format!("Err({e})"),
        };
        f.debug_struct("DecryptedEntry")
            .field("seq", &self.seq)
            .field("content", &content)
            .finish()
    }
}

/// Subject record vault over an injected [`SubjectStore`].
///
/// Takes no caller identity: authorization is decided before calling in.
/// Appends for the same subject are serialised by the store.
pub struct RecordVault<S: ?Sized> {
    store: Arc<S>,
    deriver: Arc<KekDeriver>,
    audit: Arc<dyn AuditSink>,
}

impl<S: ?Sized> Clone for RecordVault<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            deriver: Arc::clone(&self.deriver),
            audit: Arc::clone(&self.audit),
        }
    }
}

impl<S: ?Sized> fmt::Debug for RecordVault<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordVault")
            .field("deriver", &self.deriver)
            .finish_non_exhaustive()
    }
}

impl<S: SubjectStore + ?Sized> RecordVault<S> {
    pub fn new(store: Arc<S>, config: &VaultConfig) -> VaultResult<Self> {
        Ok(Self::with_deriver(store, config.build_deriver()?))
    }

    pub fn with_deriver(store: Arc<S>, deriver: KekDeriver) -> Self {
        Self {
            store,
            deriver: Arc::new(deriver),
            audit: Arc::new(TracingAuditSink),
        }
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Provisions a new subject and stores its envelope.
    pub fn onboard(&self, subject_id: &str) -> VaultResult<()> {
        if self.store.get_envelope(subject_id)?.is_some() {
            return Err(VaultError::AlreadyProvisioned(subject_id.to_string()));
        }
        let envelope = provision_with(&self.deriver, subject_id)?;
        self.store.insert_envelope(subject_id, &envelope)?;

        debug!(subject_id, "subject provisioned");
        self.audit
            .record(&AuditEvent::now(subject_id, AuditAction::Provisioned));
        Ok(())
    }

    /// Encrypts `plaintext` as a new entry and appends it.
    ///
    /// Returns the entry's sequence number.
    pub fn append_entry(&self, subject_id: &str, plaintext: &str) -> VaultResult<u64> {
        let envelope = self.load_envelope(subject_id)?;
        let dek = self.open_dek(subject_id, &envelope, AuditAction::EntryAppended)?;
        let entry = encrypt_entry(&dek, plaintext)?;
        drop(dek);

        let seq = self.store.append_entry(subject_id, &entry)?;
        self.audit
            .record(&AuditEvent::now(subject_id, AuditAction::EntryAppended));
        Ok(seq)
    }

    /// Decrypts every entry of the subject's history independently.
    ///
    /// A bad entry yields an `Err` in its own slot; the rest still decrypt.
    /// Envelope failure fails the whole call.
    pub fn read_history(&self, subject_id: &str) -> VaultResult<Vec<DecryptedEntry>> {
        let envelope = self.load_envelope(subject_id)?;
        let dek = self.open_dek(subject_id, &envelope, AuditAction::HistoryRead)?;
        let stored = self.store.list_entries(subject_id)?;

        let history: Vec<DecryptedEntry> = stored
            .iter()
            .map(|s| {
                let content = decrypt_entry(&dek, &s.entry);
                if let Err(e) = &content {
                    warn!(subject_id, seq = s.seq, error = %e, "record entry unreadable");
                }
                DecryptedEntry {
                    seq: s.seq,
                    content,
                }
            })
            .collect();
        drop(dek);

        self.audit
            .record(&AuditEvent::now(subject_id, AuditAction::HistoryRead));
        Ok(history)
    }

    /// Like [`read_history`](Self::read_history), but fails on the first
    /// unreadable entry.
    pub fn read_history_strict(&self, subject_id: &str) -> VaultResult<Vec<Zeroizing<String>>> {
        self.read_history(subject_id)?
            .into_iter()
            .map(|entry| {
                entry.content.map_err(|source| VaultError::EntryUnreadable {
                    seq: entry.seq,
                    source,
                })
            })
            .collect()
    }

    /// Rewraps the subject's DEK for `new_deriver` and stores the result.
    ///
    /// Entries are not touched. Afterwards the subject must be accessed with
    /// a vault configured like `new_deriver`.
    pub fn rewrap_subject(&self, subject_id: &str, new_deriver: &KekDeriver) -> VaultResult<()> {
        let envelope = self.load_envelope(subject_id)?;
        let rewrapped = rewrap(&self.deriver, new_deriver, subject_id, &envelope)
            .inspect_err(|e| report_corrupt(subject_id, AuditAction::EnvelopeRewrapped, e))?;
        self.store.update_envelope(subject_id, &rewrapped)?;

        self.audit
            .record(&AuditEvent::now(subject_id, AuditAction::EnvelopeRewrapped));
        Ok(())
    }

    fn load_envelope(&self, subject_id: &str) -> VaultResult<Envelope> {
        self.store
            .get_envelope(subject_id)?
            .ok_or_else(|| VaultError::SubjectNotFound(subject_id.to_string()))
    }

    fn open_dek(
        &self,
        subject_id: &str,
        envelope: &Envelope,
        action: AuditAction,
    ) -> VaultResult<Dek> {
        unwrap_with(&self.deriver, subject_id, envelope)
            .inspect_err(|e| report_corrupt(subject_id, action, e))
            .map_err(VaultError::from)
    }
}

fn report_corrupt(subject_id: &str, action: AuditAction, err: &CryptoError) {
    if matches!(err, CryptoError::EnvelopeCorrupt(_)) {
        error!(
            subject_id,
            action = action.as_str(),
            "envelope unwrap failed; subject records are inaccessible"
        );
    }
}

impl<S: SubjectStore + ?Sized + 'static> RecordVault<S> {
    /// [`onboard`](Self::onboard) on the blocking pool.
    pub async fn onboard_async(&self, subject_id: impl Into<String>) -> VaultResult<()> {
        let vault = self.clone();
        let subject_id = subject_id.into();
        tokio::task::spawn_blocking(move || vault.onboard(&subject_id)).await?
    }

    /// [`append_entry`](Self::append_entry) on the blocking pool.
    pub async fn append_entry_async(
        &self,
        subject_id: impl Into<String>,
        plaintext: impl Into<String>,
    ) -> VaultResult<u64> {
        let vault = self.clone();
        let subject_id = subject_id.into();
        let plaintext = Zeroizing::new(plaintext.into());
        tokio::task::spawn_blocking(move || vault.append_entry(&subject_id, &plaintext)).await?
    }

    /// [`read_history`](Self::read_history) on the blocking pool.
    pub async fn read_history_async(
        &self,
        subject_id: impl Into<String>,
    ) -> VaultResult<Vec<DecryptedEntry>> {
        let vault = self.clone();
        let subject_id = subject_id.into();
        tokio::task::spawn_blocking(move || vault.read_history(&subject_id)).await?
    }
}
