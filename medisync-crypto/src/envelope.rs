//! Per-subject DEK envelopes.
//!
//! A subject is provisioned once: a random DEK is generated and wrapped with
//! a KEK derived from the subject identifier and a fresh salt. The resulting
//! [`Envelope`] is stored by the caller next to the subject. On every later
//! read or write the KEK is re-derived and the DEK unwrapped.
//!
//! Losing any envelope field makes the subject's records unrecoverable.
//! There is no escrow.

use crate::cipher::{self, NONCE_SIZE};
use crate::encoding::{decode_array, decode_field, encode};
use crate::error::{AuthenticationError, CryptoError, CryptoResult};
use crate::key::{generate_dek, Dek, KekDeriver, Salt, SALT_SIZE};
use serde::{Deserialize, Serialize};

/// Wrapped DEK plus everything except the subject id needed to unwrap it.
///
/// All fields are standard base64.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// 16-byte KDF salt, unique per subject.
    pub salt: String,
    /// DEK sealed under the KEK (ciphertext + GCM tag).
    pub wrapped_dek: String,
    /// Nonce used for the wrap. Unique per wrap event.
    pub wrap_nonce: String,
}

/// Provisions a new subject with default KDF parameters.
pub fn provision(subject_id: &str) -> CryptoResult<Envelope> {
    provision_with(&KekDeriver::default(), subject_id)
}

/// Provisions a new subject.
///
/// Call once per subject. Provisioning again yields a different DEK and
/// orphans every entry encrypted under the old one.
pub fn provision_with(deriver: &KekDeriver, subject_id: &str) -> CryptoResult<Envelope> {
    let dek = generate_dek()?;
    seal(deriver, subject_id, &dek)
}

/// Unwraps a subject's DEK with default KDF parameters.
pub fn unwrap(subject_id: &str, envelope: &Envelope) -> CryptoResult<Dek> {
    unwrap_with(&KekDeriver::default(), subject_id, envelope)
}

/// Re-derives the KEK and opens the wrapped DEK.
///
/// A tag failure means the envelope is corrupt or belongs to another
/// subject id, and is reported as [`CryptoError::EnvelopeCorrupt`]. So is
/// any stored field that does not decode to its expected size, and a
/// wrapped key that opens but is not [`KEY_SIZE`](crate::KEY_SIZE) bytes.
pub fn unwrap_with(
    deriver: &KekDeriver,
    subject_id: &str,
    envelope: &Envelope,
) -> CryptoResult<Dek> {
    let salt = decode_array::<SALT_SIZE>("salt", &envelope.salt).map_err(corrupt)?;
    let nonce = decode_array::<NONCE_SIZE>("wrap_nonce", &envelope.wrap_nonce).map_err(corrupt)?;
    let wrapped = decode_field("wrapped_dek", &envelope.wrapped_dek).map_err(corrupt)?;

    let kek = deriver.derive(subject_id, &salt)?;
    let dek_bytes = cipher::decrypt(kek.as_bytes(), &nonce, &wrapped, &[]).map_err(|e| match e {
        CryptoError::Authentication(auth) => CryptoError::EnvelopeCorrupt(auth),
        other => other,
    })?;
    Dek::from_slice(&dek_bytes).map_err(corrupt)
}

fn corrupt(_: CryptoError) -> CryptoError {
    CryptoError::EnvelopeCorrupt(AuthenticationError)
}

/// Wraps the subject's existing DEK again under a fresh salt and nonce.
///
/// Record entries are untouched and stay readable. Used when the KDF cost
/// or pepper changes for a subject.
pub fn rewrap(
    old: &KekDeriver,
    new: &KekDeriver,
    subject_id: &str,
    envelope: &Envelope,
) -> CryptoResult<Envelope> {
    let dek = unwrap_with(old, subject_id, envelope)?;
    seal(new, subject_id, &dek)
}

fn seal(deriver: &KekDeriver, subject_id: &str, dek: &Dek) -> CryptoResult<Envelope> {
    let salt = Salt::random()?;
    let kek = deriver.derive(subject_id, salt.as_bytes())?;
    let wrapped = cipher::encrypt(kek.as_bytes(), dek.as_bytes(), &[])?;

    Ok(Envelope {
        salt: encode(salt.as_bytes()),
        wrapped_dek: encode(&wrapped.ciphertext),
        wrap_nonce: encode(&wrapped.nonce),
    })
}
