//! AES-256-GCM authenticated encryption.
//!
//! Used both to wrap DEKs under a KEK and to encrypt record entries under a
//! DEK. Every encryption must use a nonce never used before with the same
//! key; [`encrypt`] draws a fresh random one each call.

use crate::error::{AuthenticationError, CryptoError, CryptoResult};
use crate::key::{fill_random, KEY_SIZE};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use zeroize::Zeroizing;

/// AES-GCM nonce size in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Ciphertext together with the nonce it was sealed under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncryptedData {
    pub nonce: [u8; NONCE_SIZE],
    /// Ciphertext with the GCM tag appended.
    pub ciphertext: Vec<u8>,
}

fn cipher_for(key: &[u8]) -> CryptoResult<Aes256Gcm> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "key must be {KEY_SIZE} bytes, got {}",
            key.len()
        )));
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::InvalidInput("invalid key".into()))
}

fn check_nonce(nonce: &[u8]) -> CryptoResult<()> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidInput(format!(
            "nonce must be {NONCE_SIZE} bytes, got {}",
            nonce.len()
        )));
    }
    Ok(())
}

/// Encrypts `plaintext` under `key` with a fresh random nonce.
pub fn encrypt(key: &[u8], plaintext: &[u8], aad: &[u8]) -> CryptoResult<EncryptedData> {
    let mut nonce = [0u8; NONCE_SIZE];
    fill_random(&mut nonce)?;
    let ciphertext = encrypt_with_nonce(key, &nonce, plaintext, aad)?;
    Ok(EncryptedData { nonce, ciphertext })
}

/// Encrypts with a caller-supplied nonce.
///
/// The caller owns nonce uniqueness: reusing a nonce under the same key
/// breaks confidentiality of both messages.
pub fn encrypt_with_nonce(
    key: &[u8],
    nonce: &[u8],
    plaintext: &[u8],
    aad: &[u8],
) -> CryptoResult<Vec<u8>> {
    let cipher = cipher_for(key)?;
    check_nonce(nonce)?;
    cipher
        .encrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Decrypts and verifies `ciphertext`.
///
/// Any tag failure, whatever its cause, is reported as the same
/// [`AuthenticationError`].
pub fn decrypt(
    key: &[u8],
    nonce: &[u8],
    ciphertext: &[u8],
    aad: &[u8],
) -> CryptoResult<Zeroizing<Vec<u8>>> {
    let cipher = cipher_for(key)?;
    check_nonce(nonce)?;
    cipher
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map(Zeroizing::new)
        .map_err(|_| CryptoError::Authentication(AuthenticationError))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_SIZE] = [0x11; KEY_SIZE];

    #[test]
    fn round_trip() {
        let sealed = encrypt(&KEY, b"hello", b"").unwrap();
        assert_eq!(sealed.ciphertext.len(), 5 + TAG_SIZE);
        let opened = decrypt(&KEY, &sealed.nonce, &sealed.ciphertext, b"").unwrap();
        assert_eq!(opened.as_slice(), b"hello");
    }

    #[test]
    fn empty_plaintext_round_trips() {
        let sealed = encrypt(&KEY, b"", b"").unwrap();
        assert_eq!(sealed.ciphertext.len(), TAG_SIZE);
        let opened = decrypt(&KEY, &sealed.nonce, &sealed.ciphertext, b"").unwrap();
        assert!(opened.is_empty());
    }

    #[test]
    fn aad_is_authenticated() {
        let sealed = encrypt(&KEY, b"hello", b"subject-a").unwrap();
        let err = decrypt(&KEY, &sealed.nonce, &sealed.ciphertext, b"subject-b").unwrap_err();
        assert!(matches!(err, CryptoError::Authentication(_)));
    }

    #[test]
    fn explicit_nonce_is_deterministic() {
        let nonce = [0x22; NONCE_SIZE];
        let a = encrypt_with_nonce(&KEY, &nonce, b"same", b"").unwrap();
        let b = encrypt_with_nonce(&KEY, &nonce, b"same", b"").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn matches_aes_256_gcm_reference_vectors() {
        // McGrew-Viega GCM test cases 13 and 14: zero key, zero IV.
        let key = [0u8; KEY_SIZE];
        let nonce = [0u8; NONCE_SIZE];

        let empty = encrypt_with_nonce(&key, &nonce, b"", b"").unwrap();
        assert_eq!(hex::encode(&empty), "530f8afbc74536b9a963b4f1c4cb738b");

        let block = encrypt_with_nonce(&key, &nonce, &[0u8; 16], b"").unwrap();
        assert_eq!(
            hex::encode(&block),
            "cea7403d4d606b6e074ec5d3baf39d18d0d1c8a799996bf0265b98b5d48ab919"
        );
        let opened = decrypt(&key, &nonce, &block, b"").unwrap();
        assert_eq!(opened.as_slice(), &[0u8; 16]);
    }

    #[test]
    fn wrong_key_and_tampering_give_identical_errors() {
        let sealed = encrypt(&KEY, b"hello", b"").unwrap();

        let wrong_key = decrypt(&[0x12; KEY_SIZE], &sealed.nonce, &sealed.ciphertext, b"")
            .unwrap_err()
            .to_string();

        let mut tampered = sealed.ciphertext.clone();
        tampered[0] ^= 0x01;
        let corrupted = decrypt(&KEY, &sealed.nonce, &tampered, b"")
            .unwrap_err()
            .to_string();

        assert_eq!(wrong_key, corrupted);
    }

    #[test]
    fn bad_lengths_are_invalid_input() {
        let err = encrypt(&[0u8; 16], b"x", b"").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidInput(_)));

        let err = decrypt(&KEY, &[0u8; 8], &[0u8; 32], b"").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidInput(_)));
    }

    #[test]
    fn truncated_ciphertext_fails_authentication() {
        let err = decrypt(&KEY, &[0u8; NONCE_SIZE], &[0u8; 4], b"").unwrap_err();
        assert!(matches!(err, CryptoError::Authentication(_)));
    }
}
