//! # Cryptographic Primitives
//!
//! The primitive layer under every envelope generation:
//!
//! - **Argon2id** ([`Derive`]): key derivation for the v2 generation, with
//!   device-tiered cost parameters persisted in each envelope
//! - **PBKDF2-HMAC-SHA256** ([`derive_key_pbkdf2`]): key derivation for the
//!   native generations, fixed at 600 000 iterations
//! - **AES-256-GCM** ([`AesGcm`]): authenticated encryption for every
//!   generation except the oldest, 128-bit tag appended to the ciphertext
//! - **Passphrase AES** ([`passphrase`]): the unauthenticated legacy container
//!
//! ## Key material
//!
//! Derived keys are returned inside [`Protected`], which zeroizes on drop.
//! [`seal`] and [`open`] derive, use and drop the key within one call, so no
//! key outlives the AEAD operation it was derived for. Both run their
//! derivation and their AEAD call on the blocking pool, one await each.
//!
//! ## Failure surface
//!
//! Tag mismatches surface as [`Error::DecryptionFailed`] with no detail. A
//! wrong password and a flipped ciphertext byte look identical to callers.

mod aes_gcm;
mod derive;
pub mod passphrase;
mod pbkdf;
mod protected;

pub use aes_gcm::AesGcm;
pub use derive::{Derive, ensure_backend, random_bytes};
pub use pbkdf::derive_key_pbkdf2;
pub use protected::Protected;

use std::sync::Arc;

use tokio::task::spawn_blocking;

use crate::config::{AES_NONCE_SIZE, AES_TAG_SIZE, ARGON_SALT_LEN, KEY_SIZE, PBKDF2_ITERATIONS, PBKDF2_SALT_LEN};
use crate::error::{Error, Result};
use crate::header::Argon2Params;
use crate::secret::{Secret, SecretBytes};

/// Which derivation a blob was sealed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kdf {
    /// Argon2id with a 32 byte salt.
    Argon2id(Argon2Params),
    /// PBKDF2-HMAC-SHA256, 600 000 iterations, 16 byte salt.
    Pbkdf2,
}

impl Kdf {
    /// Salt length the derivation expects.
    #[inline]
    pub const fn salt_len(&self) -> usize {
        match self {
            Self::Argon2id(_) => ARGON_SALT_LEN,
            Self::Pbkdf2 => PBKDF2_SALT_LEN,
        }
    }

    /// Runs the derivation. The returned key is wiped on drop.
    pub fn derive(&self, password: &[u8], salt: &[u8]) -> Result<Protected<[u8; KEY_SIZE]>> {
        match self {
            Self::Argon2id(params) => Derive::new(password)?.derive_key(salt, params),
            Self::Pbkdf2 => derive_key_pbkdf2(password, salt, PBKDF2_ITERATIONS),
        }
    }
}

/// Derives a key on the blocking pool. One suspension point.
pub async fn derive_async(password: Arc<Secret>, kdf: Kdf, salt: Vec<u8>) -> Result<Protected<[u8; KEY_SIZE]>> {
    spawn_blocking(move || kdf.derive(password.expose_secret().as_bytes(), &salt)).await?
}

/// Encrypts `plaintext` under a fresh random salt and IV.
///
/// Returns the self-contained blob `salt || iv(12) || ciphertext || tag(16)`.
/// The salt length follows `kdf`. Every call draws new randomness, so sealing
/// the same input twice never yields the same blob. Derivation and encryption
/// each run on the blocking pool; the key is moved into the encryption task
/// and wiped when it ends.
pub async fn seal(password: Arc<Secret>, kdf: Kdf, plaintext: SecretBytes) -> Result<Vec<u8>> {
    let random_salt = random_bytes::<ARGON_SALT_LEN>();
    let salt = random_salt[..kdf.salt_len()].to_vec();
    let iv = random_bytes::<AES_NONCE_SIZE>();

    let key = derive_async(password, kdf, salt.clone()).await?;
    let ciphertext = spawn_blocking(move || AesGcm::new(key.expose())?.encrypt(&iv, plaintext.expose_secret())).await??;

    let mut blob = Vec::with_capacity(salt.len() + AES_NONCE_SIZE + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&iv);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Opens a blob produced by [`seal`].
///
/// # Errors
///
/// [`Error::MalformedEnvelope`] if the blob cannot hold a salt, IV and tag;
/// [`Error::DecryptionFailed`] on authentication failure.
pub async fn open(password: Arc<Secret>, kdf: Kdf, blob: &[u8]) -> Result<Vec<u8>> {
    let (salt, iv, ciphertext) = split_blob(blob, kdf.salt_len())?;
    let iv = *iv;
    let ciphertext = ciphertext.to_vec();

    let key = derive_async(password, kdf, salt.to_vec()).await?;
    spawn_blocking(move || AesGcm::new(key.expose())?.decrypt(&iv, &ciphertext)).await?
}

/// Splits `salt || iv || ciphertext` without copying.
pub fn split_blob(blob: &[u8], salt_len: usize) -> Result<(&[u8], &[u8; AES_NONCE_SIZE], &[u8])> {
    let minimum = salt_len + AES_NONCE_SIZE + AES_TAG_SIZE;
    if blob.len() < minimum {
        return Err(Error::MalformedEnvelope(format!("blob of {} bytes is shorter than the {minimum} byte minimum", blob.len())));
    }

    let (salt, rest) = blob.split_at(salt_len);
    let (iv, ciphertext) = rest.split_at(AES_NONCE_SIZE);
    let iv: &[u8; AES_NONCE_SIZE] = iv.try_into().map_err(|_| Error::MalformedEnvelope("invalid iv length".to_owned()))?;
    Ok((salt, iv, ciphertext))
}
