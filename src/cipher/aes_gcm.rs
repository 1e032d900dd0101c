use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::config::{AES_NONCE_SIZE, AES_TAG_SIZE, KEY_SIZE};
use crate::error::{Error, Result};

/// AES-256-GCM with a caller supplied IV.
///
/// The envelope formats store the IV next to the salt, so unlike a
/// nonce-prepending wrapper this type neither generates nor frames the IV.
/// Output is `ciphertext || tag(16)`.
pub struct AesGcm {
    inner: Aes256Gcm,
}

impl AesGcm {
    #[inline]
    pub fn new(key: &[u8; KEY_SIZE]) -> Result<Self> {
        let inner = Aes256Gcm::new_from_slice(key).map_err(|e| Error::Encryption(format!("invalid aes key: {e}")))?;
        Ok(Self { inner })
    }

    #[inline]
    pub fn encrypt(&self, iv: &[u8; AES_NONCE_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
        self.inner.encrypt(Nonce::from_slice(iv), plaintext).map_err(|e| Error::Encryption(format!("aes-gcm encryption failed: {e}")))
    }

    /// Verifies the tag and decrypts.
    ///
    /// Every failure, including a buffer too short to hold a tag, is reported
    /// as [`Error::DecryptionFailed`] without further detail.
    #[inline]
    pub fn decrypt(&self, iv: &[u8; AES_NONCE_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < AES_TAG_SIZE {
            return Err(Error::DecryptionFailed);
        }

        self.inner.decrypt(Nonce::from_slice(iv), ciphertext).map_err(|_| Error::DecryptionFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let cipher = AesGcm::new(&[3u8; KEY_SIZE]).unwrap();
        let iv = [1u8; AES_NONCE_SIZE];

        let ciphertext = cipher.encrypt(&iv, b"Hello, World!").unwrap();
        assert_eq!(ciphertext.len(), 13 + AES_TAG_SIZE);
        assert_eq!(cipher.decrypt(&iv, &ciphertext).unwrap(), b"Hello, World!");
    }

    #[test]
    fn test_empty_plaintext() {
        let cipher = AesGcm::new(&[3u8; KEY_SIZE]).unwrap();
        let iv = [1u8; AES_NONCE_SIZE];

        let ciphertext = cipher.encrypt(&iv, b"").unwrap();
        assert_eq!(ciphertext.len(), AES_TAG_SIZE);
        assert!(cipher.decrypt(&iv, &ciphertext).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_key() {
        let iv = [1u8; AES_NONCE_SIZE];
        let ciphertext = AesGcm::new(&[3u8; KEY_SIZE]).unwrap().encrypt(&iv, b"secret").unwrap();
        let result = AesGcm::new(&[4u8; KEY_SIZE]).unwrap().decrypt(&iv, &ciphertext);
        assert!(matches!(result, Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_tampered_tag() {
        let cipher = AesGcm::new(&[3u8; KEY_SIZE]).unwrap();
        let iv = [1u8; AES_NONCE_SIZE];
        let mut ciphertext = cipher.encrypt(&iv, b"secret").unwrap();
        let last = ciphertext.len() - 1;
        ciphertext[last] ^= 0x01;
        assert!(matches!(cipher.decrypt(&iv, &ciphertext), Err(Error::DecryptionFailed)));
    }

    #[test]
    fn test_too_short() {
        let cipher = AesGcm::new(&[3u8; KEY_SIZE]).unwrap();
        assert!(matches!(cipher.decrypt(&[0u8; AES_NONCE_SIZE], &[0u8; 4]), Err(Error::DecryptionFailed)));
    }
}
