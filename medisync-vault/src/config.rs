//! Vault configuration.

use crate::error::{VaultError, VaultResult};
use medisync_crypto::{decode_field, KdfParams, KekDeriver, DEFAULT_ITERATIONS};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Environment variable overriding the PBKDF2 iteration count.
pub const ENV_KDF_ITERATIONS: &str = "MEDISYNC_KDF_ITERATIONS";

/// Environment variable carrying the base64 server pepper.
pub const ENV_KDF_PEPPER: &str = "MEDISYNC_KDF_PEPPER";

/// Configuration for a [`RecordVault`](crate::RecordVault).
#[derive(Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// PBKDF2-HMAC-SHA256 iterations for KEK derivation.
    pub kdf_iterations: u32,

    /// Optional server-held secret mixed into KEK derivation (standard base64).
    ///
    /// Changing this makes existing envelopes unreadable until they are
    /// rewrapped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf_pepper: Option<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf_iterations: DEFAULT_ITERATIONS,
            kdf_pepper: None,
        }
    }
}

impl VaultConfig {
    /// Reads overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads overrides through `lookup`. Unparsable values keep the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_KDF_ITERATIONS) {
            match raw.trim().parse() {
                Ok(iterations) => config.kdf_iterations = iterations,
                Err(_) => warn!(
                    var = ENV_KDF_ITERATIONS,
                    "ignoring unparsable iteration count, using default"
                ),
            }
        }

        config.kdf_pepper = lookup(ENV_KDF_PEPPER).filter(|p| !p.trim().is_empty());
        config
    }

    /// Builds the KEK deriver, enforcing the iteration floor and decoding
    /// the pepper.
    pub fn build_deriver(&self) -> VaultResult<KekDeriver> {
        let deriver = KekDeriver::new(KdfParams {
            iterations: self.kdf_iterations,
        })
        .map_err(|e| VaultError::Config(e.to_string()))?;

        match &self.kdf_pepper {
            None => Ok(deriver),
            Some(encoded) => {
                let pepper = decode_field("kdf_pepper", encoded.trim())
                    .map_err(|e| VaultError::Config(e.to_string()))?;
                deriver
                    .with_pepper(pepper)
                    .map_err(|e| VaultError::Config(e.to_string()))
            }
        }
    }
}

impl fmt::Debug for VaultConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VaultConfig")
            .field("kdf_iterations", &self.kdf_iterations)
            .field("kdf_pepper", &self.kdf_pepper.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
