//! Key material and KEK derivation.

use crate::error::{CryptoError, CryptoResult};
use rand::rngs::OsRng;
use rand::TryRngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Size of KEKs and DEKs in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Size of the per-subject KDF salt in bytes.
pub const SALT_SIZE: usize = 16;

/// Lowest PBKDF2 iteration count a deriver will accept.
///
/// Subject identifiers are not secret and may be low-entropy, so iteration
/// cost is the main obstacle to offline search.
pub const MIN_ITERATIONS: u32 = 100_000;

/// Iteration count used when none is configured.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Fills `buf` from the operating system CSPRNG.
pub(crate) fn fill_random(buf: &mut [u8]) -> CryptoResult<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| CryptoError::Rng(e.to_string()))
}

/// Key-Encryption Key. Derived on demand, never persisted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Kek([u8; KEY_SIZE]);

impl Kek {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Kek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Kek([REDACTED])")
    }
}

/// Data-Encryption Key. Random per subject, persisted only in wrapped form.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Dek([u8; KEY_SIZE]);

impl Dek {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Builds a DEK from an unwrapped byte slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidInput(format!(
                "data key must be {KEY_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Dek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dek([REDACTED])")
    }
}

/// Generates a fresh random DEK.
pub fn generate_dek() -> CryptoResult<Dek> {
    let mut bytes = [0u8; KEY_SIZE];
    fill_random(&mut bytes)?;
    let dek = Dek(bytes);
    bytes.zeroize();
    Ok(dek)
}

/// Per-subject KDF salt. Not secret.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    pub fn random() -> CryptoResult<Self> {
        let mut bytes = [0u8; SALT_SIZE];
        fill_random(&mut bytes)?;
        Ok(Self(bytes))
    }

    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; SALT_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidInput(format!(
                "salt must be {SALT_SIZE} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; SALT_SIZE] {
        &self.0
    }
}

/// Tunable PBKDF2 cost.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// PBKDF2-HMAC-SHA256 iteration count.
    pub iterations: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl KdfParams {
    pub fn validate(&self) -> CryptoResult<()> {
        if self.iterations < MIN_ITERATIONS {
            return Err(CryptoError::InvalidInput(format!(
                "kdf iterations {} below minimum {MIN_ITERATIONS}",
                self.iterations
            )));
        }
        Ok(())
    }
}

/// Derives KEKs from subject identifiers.
///
/// Without a pepper the PBKDF2 password is the subject identifier alone, so
/// confidentiality rests on the salt and the iteration cost. A pepper mixes a
/// server-held secret into the password:
/// `u32_be(len(subject_id)) || subject_id || pepper`.
pub struct KekDeriver {
    params: KdfParams,
    pepper: Option<Zeroizing<Vec<u8>>>,
}

impl KekDeriver {
    pub fn new(params: KdfParams) -> CryptoResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            pepper: None,
        })
    }

    /// Adds a server-held secret to every derivation.
    ///
    /// Envelopes provisioned without a pepper will not open with one (and
    /// vice versa); migrate them with [`crate::rewrap`].
    pub fn with_pepper(mut self, pepper: impl Into<Vec<u8>>) -> CryptoResult<Self> {
        let pepper = Zeroizing::new(pepper.into());
        if pepper.is_empty() {
            return Err(CryptoError::InvalidInput("pepper must not be empty".into()));
        }
        self.pepper = Some(pepper);
        Ok(self)
    }

    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    pub fn has_pepper(&self) -> bool {
        self.pepper.is_some()
    }

    /// Derives the KEK for `(subject_id, salt)`. Deterministic.
    pub fn derive(&self, subject_id: &str, salt: &[u8]) -> CryptoResult<Kek> {
        if subject_id.is_empty() {
            return Err(CryptoError::InvalidInput(
                "subject id must not be empty".into(),
            ));
        }
        let salt = Salt::from_slice(salt)?;
        let password = self.password(subject_id)?;

        let mut out = [0u8; KEY_SIZE];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            &password,
            salt.as_bytes(),
            self.params.iterations,
            &mut out,
        );
        let kek = Kek(out);
        out.zeroize();
        Ok(kek)
    }

    fn password(&self, subject_id: &str) -> CryptoResult<Zeroizing<Vec<u8>>> {
        let Some(pepper) = &self.pepper else {
            return Ok(Zeroizing::new(subject_id.as_bytes().to_vec()));
        };
        let id_len = u32::try_from(subject_id.len())
            .map_err(|_| CryptoError::InvalidInput("subject id too long".into()))?;

        let mut password = Zeroizing::new(Vec::with_capacity(
            4 + subject_id.len() + pepper.len(),
        ));
        password.extend_from_slice(&id_len.to_be_bytes());
        password.extend_from_slice(subject_id.as_bytes());
        password.extend_from_slice(pepper);
        Ok(password)
    }
}

impl Default for KekDeriver {
    fn default() -> Self {
        Self {
            params: KdfParams::default(),
            pepper: None,
        }
    }
}

impl fmt::Debug for KekDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KekDeriver")
            .field("params", &self.params)
            .field("pepper", &self.pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Derives a KEK with default parameters and no pepper.
///
/// Fails with [`CryptoError::InvalidInput`] unless `salt` is exactly
/// [`SALT_SIZE`] bytes.
pub fn derive_kek(subject_id: &str, salt: &[u8]) -> CryptoResult<Kek> {
    KekDeriver::default().derive(subject_id, salt)
}
