//! Legacy PBKDF2-HMAC-SHA256 derivation used by the native envelope generations.

use sha2::Sha256;

use crate::cipher::Protected;
use crate::config::{KEY_SIZE, PBKDF2_SALT_LEN};
use crate::error::{Error, Result};

/// Derives the 32 byte AES key of the native generations.
///
/// `iterations` is [`crate::config::PBKDF2_ITERATIONS`] for every envelope
/// this crate reads or writes.
///
/// # Errors
///
/// [`Error::InvalidInput`] for an empty password or a salt that is not 16 bytes.
pub fn derive_key_pbkdf2(password: &[u8], salt: &[u8], iterations: u32) -> Result<Protected<[u8; KEY_SIZE]>> {
    if password.is_empty() {
        return Err(Error::InvalidInput("password cannot be empty".to_owned()));
    }

    if salt.len() != PBKDF2_SALT_LEN {
        return Err(Error::InvalidInput(format!("expected {PBKDF2_SALT_LEN} bytes salt, got {}", salt.len())));
    }

    if iterations == 0 {
        return Err(Error::KeyDerivation("pbkdf2 needs at least one iteration".to_owned()));
    }

    let mut key = Protected::new([0u8; KEY_SIZE]);
    pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, key.expose_mut());
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic() {
        let salt = *b"salt\0\0\0\0\0\0\0\0\0\0\0\0";
        let key1 = derive_key_pbkdf2(b"passwd", &salt, 1).unwrap();
        let key2 = derive_key_pbkdf2(b"passwd", &salt, 1).unwrap();
        assert_eq!(key1.expose(), key2.expose());
        assert_eq!(key1.len(), KEY_SIZE);
    }

    #[test]
    fn test_iterations_change_key() {
        let salt = [5u8; PBKDF2_SALT_LEN];
        let key1 = derive_key_pbkdf2(b"passwd", &salt, 1).unwrap();
        let key2 = derive_key_pbkdf2(b"passwd", &salt, 2).unwrap();
        assert_ne!(key1.expose(), key2.expose());
    }

    #[test]
    fn test_rejects_bad_salt() {
        assert!(matches!(derive_key_pbkdf2(b"passwd", &[0u8; 32], 1), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_empty_password() {
        assert!(matches!(derive_key_pbkdf2(b"", &[0u8; PBKDF2_SALT_LEN], 1), Err(Error::InvalidInput(_))));
    }
}
