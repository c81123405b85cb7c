//! Metadata-only audit hook.
//!
//! The vault reports what happened to which subject and when. It never
//! reports who did it (callers own identity) and never reports contents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Provisioned,
    EntryAppended,
    HistoryRead,
    EnvelopeRewrapped,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provisioned => "provisioned",
            Self::EntryAppended => "entry_appended",
            Self::HistoryRead => "history_read",
            Self::EnvelopeRewrapped => "envelope_rewrapped",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub subject_id: String,
    pub action: AuditAction,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn now(subject_id: &str, action: AuditAction) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            action,
            timestamp: Utc::now(),
        }
    }
}

/// Receives an event after each successful vault operation.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent);
}

/// Emits audit events as `tracing` events on the `medisync::audit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: &AuditEvent) {
        info!(
            target: "medisync::audit",
            subject_id = %event.subject_id,
            action = event.action.as_str(),
            timestamp = %event.timestamp.to_rfc3339(),
            "vault operation"
        );
    }
}
