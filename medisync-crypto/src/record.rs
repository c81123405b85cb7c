//! Record entry encryption under a subject's DEK.
//!
//! Entries are independent: each has its own nonce, and a subject's
//! collection grows by appending without re-encrypting earlier entries.

use crate::cipher::{self, NONCE_SIZE};
use crate::encoding::{decode_array, decode_field, encode};
use crate::error::{CryptoError, CryptoResult};
use crate::key::Dek;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// One encrypted record entry (e.g. one medical-history item).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Base64 ciphertext with GCM tag.
    pub ciphertext: String,
    /// Base64 nonce, unique per entry.
    pub entry_nonce: String,
}

/// Encrypts a single entry with a fresh nonce.
pub fn encrypt_entry(dek: &Dek, plaintext: &str) -> CryptoResult<RecordEntry> {
    let sealed = cipher::encrypt(dek.as_bytes(), plaintext.as_bytes(), &[])?;
    Ok(RecordEntry {
        ciphertext: encode(&sealed.ciphertext),
        entry_nonce: encode(&sealed.nonce),
    })
}

/// Decrypts a single entry.
pub fn decrypt_entry(dek: &Dek, entry: &RecordEntry) -> CryptoResult<Zeroizing<String>> {
    let nonce = decode_array::<NONCE_SIZE>("entry_nonce", &entry.entry_nonce)?;
    let ciphertext = decode_field("ciphertext", &entry.ciphertext)?;
    let plaintext = cipher::decrypt(dek.as_bytes(), &nonce, &ciphertext, &[])?;

    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| CryptoError::InvalidInput("record plaintext is not valid UTF-8".into()))?;
    Ok(Zeroizing::new(text.to_owned()))
}

/// Decrypts each entry on its own.
///
/// The output has one slot per input, in order. A failing entry does not
/// affect its siblings; whether one failure spoils the whole read is the
/// caller's decision.
pub fn decrypt_entries<'a, I>(dek: &Dek, entries: I) -> Vec<CryptoResult<Zeroizing<String>>>
where
    I: IntoIterator<Item = &'a RecordEntry>,
{
    entries
        .into_iter()
        .map(|entry| decrypt_entry(dek, entry))
        .collect()
}
