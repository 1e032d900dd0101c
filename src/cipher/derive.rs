//! # Key Derivation with Argon2id
//!
//! Derives the raw AES-256 key of the v2 envelope generation from a password,
//! a 32 byte salt and the [`Argon2Params`] recorded in the envelope.
//!
//! Derivation is deterministic: the same password, salt and parameters always
//! yield the same key, on every platform. Decryption depends on this.
//!
//! The block memory is reserved fallibly before hashing so that a cost the
//! host cannot satisfy surfaces as [`Error::KeyDerivation`] instead of an
//! allocator abort.

use std::sync::LazyLock;

use argon2::Algorithm::Argon2id;
use argon2::Version::V0x13;
use argon2::{Argon2, Block, Params};
use rand::RngCore;
use tracing::debug;

use crate::cipher::Protected;
use crate::config::{ARGON_MIN_MEMORY, ARGON_SALT_LEN, KEY_SIZE};
use crate::error::{Error, Result};
use crate::header::Argon2Params;

/// Process-wide Argon2 backend check, run once on first use.
///
/// Derives the same tiny key twice and compares. A backend that is not
/// deterministic would make every envelope undecryptable, so it is refused.
static BACKEND: LazyLock<std::result::Result<(), String>> = LazyLock::new(|| {
    let params = Params::new(ARGON_MIN_MEMORY, 1, 1, Some(KEY_SIZE)).map_err(|e| e.to_string())?;
    let argon2 = Argon2::new(Argon2id, V0x13, params);

    let mut first = [0u8; KEY_SIZE];
    let mut second = [0u8; KEY_SIZE];
    argon2.hash_password_into(b"vlock", b"backend-check", &mut first).map_err(|e| e.to_string())?;
    argon2.hash_password_into(b"vlock", b"backend-check", &mut second).map_err(|e| e.to_string())?;

    if first != second {
        return Err("argon2 backend is not deterministic".to_owned());
    }

    debug!("argon2id backend ready");
    Ok(())
});

/// Returns an error if the Argon2 backend failed its one-time check.
pub fn ensure_backend() -> Result<()> {
    BACKEND.as_ref().map(|()| ()).map_err(|e| Error::KeyDerivation(e.clone()))
}

/// # Key Derivation Function
///
/// Wraps a borrowed password for Argon2id derivation. The password is never
/// copied; the derived key is returned inside [`Protected`] and wiped when the
/// caller drops it.
pub struct Derive<'a> {
    password: &'a [u8],
}

impl<'a> Derive<'a> {
    /// Creates a derivation context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty password.
    pub fn new(password: &'a [u8]) -> Result<Self> {
        if password.is_empty() {
            return Err(Error::InvalidInput("password cannot be empty".to_owned()));
        }

        Ok(Self { password })
    }

    /// Derives the 32 byte key.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if the salt is not 32 bytes
    /// - [`Error::InvalidParameters`] if `params` are out of range
    /// - [`Error::KeyDerivation`] if memory cannot be reserved or hashing fails
    pub fn derive_key(&self, salt: &[u8], params: &Argon2Params) -> Result<Protected<[u8; KEY_SIZE]>> {
        if salt.len() != ARGON_SALT_LEN {
            return Err(Error::InvalidInput(format!("expected {ARGON_SALT_LEN} bytes salt, got {}", salt.len())));
        }

        params.validate()?;
        ensure_backend()?;

        let argon_params = Params::new(params.memory, params.iterations, params.parallelism, Some(KEY_SIZE)).map_err(|e| Error::InvalidParameters(e.to_string()))?;
        let argon2 = Argon2::new(Argon2id, V0x13, argon_params.clone());

        // Working memory is derived from the password; wiped on every return path.
        let block_count = argon_params.block_count();
        let mut blocks: Protected<Vec<Block>> = Protected::new(Vec::new());
        blocks
            .expose_mut()
            .try_reserve_exact(block_count)
            .map_err(|e| Error::KeyDerivation(format!("cannot reserve {} KiB: {e}", params.memory)))?;
        blocks.expose_mut().resize(block_count, Block::default());

        debug!(memory = params.memory, iterations = params.iterations, parallelism = params.parallelism, "deriving argon2id key");

        let mut key = Protected::new([0u8; KEY_SIZE]);
        argon2
            .hash_password_into_with_memory(self.password, salt, key.expose_mut(), blocks.expose_mut().as_mut_slice())
            .map_err(|e| Error::KeyDerivation(e.to_string()))?;

        Ok(key)
    }
}

/// Fills an `N` byte array from the thread-local CSPRNG (seeded from the OS).
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHEAP: Argon2Params = Argon2Params::new(1024, 1, 1);

    #[test]
    fn test_derive_key() {
        let salt = random_bytes::<ARGON_SALT_LEN>();
        let key = Derive::new(b"test_password").unwrap().derive_key(&salt, &CHEAP).unwrap();
        assert_eq!(key.len(), KEY_SIZE);
    }

    #[test]
    fn test_derive_key_deterministic() {
        let salt = [0u8; ARGON_SALT_LEN];
        let derive = Derive::new(b"test_password").unwrap();
        let key1 = derive.derive_key(&salt, &CHEAP).unwrap();
        let key2 = derive.derive_key(&salt, &CHEAP).unwrap();
        assert_eq!(key1.expose(), key2.expose());
    }

    #[test]
    fn test_derive_key_depends_on_params() {
        let salt = [9u8; ARGON_SALT_LEN];
        let derive = Derive::new(b"test_password").unwrap();
        let key1 = derive.derive_key(&salt, &CHEAP).unwrap();
        let key2 = derive.derive_key(&salt, &Argon2Params::new(1024, 2, 1)).unwrap();
        assert_ne!(key1.expose(), key2.expose());
    }

    #[test]
    fn test_derive_key_empty_password() {
        assert!(matches!(Derive::new(b""), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_derive_key_invalid_salt() {
        let salt = [0u8; 16];
        let result = Derive::new(b"test_password").unwrap().derive_key(&salt, &CHEAP);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_derive_key_invalid_params() {
        let salt = [0u8; ARGON_SALT_LEN];
        let result = Derive::new(b"test_password").unwrap().derive_key(&salt, &Argon2Params::new(1024, 0, 1));
        assert!(matches!(result, Err(Error::InvalidParameters(_))));
    }

    #[test]
    fn test_block_memory_wipes() {
        use zeroize::Zeroize;

        let mut blocks: Protected<Vec<Block>> = Protected::new(vec![Block::default(); 2]);
        blocks.expose_mut()[1].as_mut()[0] = 0xDEAD_BEEF;

        blocks.expose_mut()[1].zeroize();
        assert!(blocks[1].as_ref().iter().all(|&word| word == 0));

        blocks.expose_mut().zeroize();
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_backend_ready() {
        assert!(ensure_backend().is_ok());
    }

    #[test]
    fn test_random_bytes() {
        let bytes1: [u8; 32] = random_bytes();
        let bytes2: [u8; 32] = random_bytes();
        assert_ne!(bytes1, bytes2);
    }
}
