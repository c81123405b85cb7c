//! Base64 codec used at the persistence boundary.
//!
//! Every byte-valued field (salt, nonces, ciphertexts, wrapped DEK) leaves
//! this crate as standard base64 text and is decoded only here.

use crate::error::{CryptoError, CryptoResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encodes raw bytes for storage.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decodes a stored field. The error names the field, never its content.
pub fn decode_field(field: &'static str, encoded: &str) -> CryptoResult<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|_| CryptoError::InvalidInput(format!("{field} is not valid base64")))
}

/// Decodes a stored field that must be exactly `N` bytes long.
pub(crate) fn decode_array<const N: usize>(
    field: &'static str,
    encoded: &str,
) -> CryptoResult<[u8; N]> {
    let bytes = decode_field(field, encoded)?;
    bytes.as_slice().try_into().map_err(|_| {
        CryptoError::InvalidInput(format!(
            "{field} must decode to {N} bytes, got {}",
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_garbage() {
        let err = decode_field("salt", "not base64!!").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidInput(ref m) if m.contains("salt")));
    }

    #[test]
    fn decode_array_checks_length() {
        let encoded = encode(&[7u8; 11]);
        let err = decode_array::<12>("entry_nonce", &encoded).unwrap_err();
        match err {
            CryptoError::InvalidInput(msg) => {
                assert!(msg.contains("entry_nonce"));
                assert!(msg.contains("12"));
                assert!(msg.contains("11"));
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn decode_array_accepts_exact_length() {
        let encoded = encode(&[9u8; 16]);
        assert_eq!(decode_array::<16>("salt", &encoded).unwrap(), [9u8; 16]);
    }

    #[test]
    fn uses_standard_alphabet_with_padding() {
        assert_eq!(encode(&[0xfb, 0xff]), "+/8=");
    }
}
