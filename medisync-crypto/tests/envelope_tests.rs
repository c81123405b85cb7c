use medisync_crypto::envelope::{provision, provision_with, rewrap, unwrap, unwrap_with, Envelope};
use medisync_crypto::{
    decode_field, decrypt_entry, encode, encrypt_entry, CryptoError, KdfParams, KekDeriver,
};
use pretty_assertions::assert_eq;

fn flip_bit(encoded: &str, field: &'static str, index: usize) -> String {
    let mut bytes = decode_field(field, encoded).unwrap();
    bytes[index] ^= 0x01;
    encode(&bytes)
}

#[test]
fn provision_unwrap_roundtrip() {
    let envelope = provision("AB123456").unwrap();
    let dek = unwrap("AB123456", &envelope).unwrap();

    let entry = encrypt_entry(&dek, "fever, 39°C").unwrap();
    let again = unwrap("AB123456", &envelope).unwrap();
    assert_eq!(decrypt_entry(&again, &entry).unwrap().as_str(), "fever, 39°C");
}

#[test]
fn unwrap_is_stable_across_calls() {
    let envelope = provision("CD998877").unwrap();
    let a = unwrap("CD998877", &envelope).unwrap();
    let b = unwrap("CD998877", &envelope).unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
}

#[test]
fn each_provision_produces_fresh_material() {
    let env1 = provision("AB123456").unwrap();
    let env2 = provision("AB123456").unwrap();

    assert_ne!(env1.salt, env2.salt);
    assert_ne!(env1.wrap_nonce, env2.wrap_nonce);
    assert_ne!(env1.wrapped_dek, env2.wrapped_dek);

    let dek1 = unwrap("AB123456", &env1).unwrap();
    let dek2 = unwrap("AB123456", &env2).unwrap();
    assert_ne!(dek1.as_bytes(), dek2.as_bytes());
}

#[test]
fn tampered_wrapped_dek_fails() {
    let mut envelope = provision("AB123456").unwrap();
    envelope.wrapped_dek = flip_bit(&envelope.wrapped_dek, "wrapped_dek", 0);

    let err = unwrap("AB123456", &envelope).unwrap_err();
    assert!(matches!(err, CryptoError::EnvelopeCorrupt(_)));
}

#[test]
fn tampered_wrap_tag_fails() {
    let mut envelope = provision("AB123456").unwrap();
    let last = decode_field("wrapped_dek", &envelope.wrapped_dek).unwrap().len() - 1;
    envelope.wrapped_dek = flip_bit(&envelope.wrapped_dek, "wrapped_dek", last);

    let err = unwrap("AB123456", &envelope).unwrap_err();
    assert!(matches!(err, CryptoError::EnvelopeCorrupt(_)));
}

#[test]
fn tampered_wrap_nonce_fails() {
    let mut envelope = provision("AB123456").unwrap();
    envelope.wrap_nonce = flip_bit(&envelope.wrap_nonce, "wrap_nonce", 5);

    let err = unwrap("AB123456", &envelope).unwrap_err();
    assert!(matches!(err, CryptoError::EnvelopeCorrupt(_)));
}

#[test]
fn tampered_salt_fails() {
    let mut envelope = provision("AB123456").unwrap();
    envelope.salt = flip_bit(&envelope.salt, "salt", 15);

    let err = unwrap("AB123456", &envelope).unwrap_err();
    assert!(matches!(err, CryptoError::EnvelopeCorrupt(_)));
}

#[test]
fn subject_id_mismatch_fails() {
    let envelope = provision("AB123456").unwrap();
    let err = unwrap("ab123456", &envelope).unwrap_err();
    assert!(err.is_authentication_failure());
}

#[test]
fn swapped_envelopes_do_not_open() {
    // Same identifier length and format; only the envelopes are swapped.
    let env_a = provision("AA000001").unwrap();
    let env_b = provision("AA000002").unwrap();

    assert!(unwrap("AA000001", &env_b).is_err());
    assert!(unwrap("AA000002", &env_a).is_err());
}

#[test]
fn non_base64_field_is_corrupt() {
    let mut envelope = provision("AB123456").unwrap();
    envelope.wrap_nonce = "%%%".to_string();

    let err = unwrap("AB123456", &envelope).unwrap_err();
    assert!(matches!(err, CryptoError::EnvelopeCorrupt(_)), "got {err:?}");
    assert!(err.is_authentication_failure());
}

#[test]
fn envelope_serializes_with_wire_field_names() {
    let envelope = provision("AB123456").unwrap();
    let json = serde_json::to_value(&envelope).unwrap();

    let obj = json.as_object().unwrap();
    let mut keys: Vec<_> = obj.keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["salt", "wrap_nonce", "wrapped_dek"]);

    let back: Envelope = serde_json::from_value(json).unwrap();
    assert_eq!(back, envelope);
}

#[test]
fn custom_iterations_must_match_on_unwrap() {
    let slow = KekDeriver::new(KdfParams { iterations: 150_000 }).unwrap();
    let envelope = provision_with(&slow, "AB123456").unwrap();

    assert!(unwrap_with(&slow, "AB123456", &envelope).is_ok());
    let err = unwrap("AB123456", &envelope).unwrap_err();
    assert!(matches!(err, CryptoError::EnvelopeCorrupt(_)));
}

#[test]
fn rewrap_preserves_existing_entries() {
    let old = KekDeriver::default();
    let new = KekDeriver::default().with_pepper(b"server-held".to_vec()).unwrap();

    let envelope = provision_with(&old, "AB123456").unwrap();
    let dek = unwrap_with(&old, "AB123456", &envelope).unwrap();
    let entry = encrypt_entry(&dek, "penicillin allergy").unwrap();

    let rewrapped = rewrap(&old, &new, "AB123456", &envelope).unwrap();
    let dek = unwrap_with(&new, "AB123456", &rewrapped).unwrap();
    assert_eq!(decrypt_entry(&dek, &entry).unwrap().as_str(), "penicillin allergy");
}

#[test]
fn rewrap_with_wrong_old_parameters_fails() {
    let envelope = provision("AB123456").unwrap();
    let wrong_old = KekDeriver::default().with_pepper(b"nope".to_vec()).unwrap();

    let err = rewrap(&wrong_old, &KekDeriver::default(), "AB123456", &envelope).unwrap_err();
    assert!(matches!(err, CryptoError::EnvelopeCorrupt(_)));
}
