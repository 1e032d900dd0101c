//! Argon2id cost parameters as persisted inside v2 envelopes.
//!
//! Key derivation cannot be reproduced without the exact parameters used at
//! encryption time, so every Argon2 envelope carries them: as a compact JSON
//! object in the binary format and as colon separated integers in the inline
//! text format. Once chosen for an envelope the parameters are immutable.
//!
//! On decryption the parameters come from untrusted bytes. [`Argon2Params::validate`]
//! bounds them before any memory is allocated.

use serde::{Deserialize, Serialize};

use crate::config::{ARGON_HASH_LEN, ARGON_MAX_ITERATIONS, ARGON_MAX_MEMORY, ARGON_MAX_PARALLELISM, ARGON_MIN_MEMORY};
use crate::error::{Error, Result};

/// Argon2id cost parameters.
///
/// Serialized as `{"memory":..,"iterations":..,"parallelism":..,"hashLength":..}`
/// with fields in exactly this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Argon2Params {
    /// Memory cost in KiB.
    pub memory: u32,
    /// Number of passes over memory.
    pub iterations: u32,
    /// Number of lanes.
    pub parallelism: u32,
    /// Output length in bytes. Always 32: the output is the raw AES-256 key.
    #[serde(default = "default_hash_length")]
    pub hash_length: u32,
}

fn default_hash_length() -> u32 {
    ARGON_HASH_LEN
}

impl Argon2Params {
    /// Creates a parameter set with the fixed 32 byte output length.
    #[inline]
    pub const fn new(memory: u32, iterations: u32, parallelism: u32) -> Self {
        Self { memory, iterations, parallelism, hash_length: ARGON_HASH_LEN }
    }

    /// Checks the parameters against the accepted ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameters`] when the output length is not 32,
    /// when any cost is zero or above its ceiling, or when the memory cost is
    /// below the Argon2 minimum of 8 KiB per lane.
    pub fn validate(&self) -> Result<()> {
        if self.hash_length != ARGON_HASH_LEN {
            return Err(Error::InvalidParameters(format!("hash length must be {ARGON_HASH_LEN}, got {}", self.hash_length)));
        }

        if self.iterations == 0 || self.iterations > ARGON_MAX_ITERATIONS {
            return Err(Error::InvalidParameters(format!("iterations must be within 1..={ARGON_MAX_ITERATIONS}, got {}", self.iterations)));
        }

        if self.parallelism == 0 || self.parallelism > ARGON_MAX_PARALLELISM {
            return Err(Error::InvalidParameters(format!("parallelism must be within 1..={ARGON_MAX_PARALLELISM}, got {}", self.parallelism)));
        }

        let floor = ARGON_MIN_MEMORY.saturating_mul(self.parallelism);
        if self.memory < floor || self.memory > ARGON_MAX_MEMORY {
            return Err(Error::InvalidParameters(format!("memory must be within {floor}..={ARGON_MAX_MEMORY} KiB, got {}", self.memory)));
        }

        Ok(())
    }

    /// Serializes to the compact JSON stored in binary envelopes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Encryption(format!("cannot serialize parameters: {e}")))
    }

    /// Parses the JSON parameter block of a binary envelope and validates it.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedEnvelope`] if the block is not valid JSON or if the
    /// values are out of range.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let params: Self = serde_json::from_slice(bytes).map_err(|e| Error::MalformedEnvelope(format!("invalid parameter block: {e}")))?;
        params.validate().map_err(|e| Error::MalformedEnvelope(e.to_string()))?;
        Ok(params)
    }
}
