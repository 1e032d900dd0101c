//! Passphrase AES, the oldest envelope generation.
//!
//! This is the OpenSSL `enc` compatible container that general purpose
//! JavaScript AES libraries emit when handed a passphrase instead of a key:
//!
//! ```text
//! "Salted__" || salt(8) || AES-256-CBC(PKCS#7) ciphertext
//! ```
//!
//! Key and IV come from `EVP_BytesToKey` with MD5 and a single round. The
//! container has no authentication tag, so a wrong password is only detected
//! through bad padding or a plaintext that is not UTF-8. Only decryption is
//! exposed to callers; the encoder exists for fixtures.

use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use md5::{Digest, Md5};

use crate::cipher::Protected;
use crate::config::{CBC_BLOCK_SIZE, KEY_SIZE, PASSPHRASE_MAGIC, PASSPHRASE_SALT_LEN};
use crate::error::{Error, Result};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const DERIVED_LEN: usize = KEY_SIZE + CBC_BLOCK_SIZE;
const MD5_LEN: usize = 16;

/// `EVP_BytesToKey(MD5, count = 1)` producing 32 key bytes followed by 16 IV bytes.
fn bytes_to_key(password: &[u8], salt: &[u8]) -> Protected<[u8; DERIVED_LEN]> {
    let mut derived = Protected::new([0u8; DERIVED_LEN]);
    let mut previous = Protected::new([0u8; MD5_LEN]);

    for (round, chunk) in derived.expose_mut().chunks_mut(MD5_LEN).enumerate() {
        let mut hasher = Md5::new();
        if round > 0 {
            hasher.update(previous.expose());
        }
        hasher.update(password);
        hasher.update(salt);

        previous.expose_mut().copy_from_slice(&hasher.finalize());
        chunk.copy_from_slice(previous.expose());
    }

    derived
}

/// Returns true if `data` starts like a passphrase container.
pub fn is_container(data: &[u8]) -> bool {
    data.len() >= PASSPHRASE_MAGIC.len() + PASSPHRASE_SALT_LEN + CBC_BLOCK_SIZE && data.starts_with(PASSPHRASE_MAGIC)
}

/// Decrypts a raw (already base64-decoded) passphrase container.
///
/// # Errors
///
/// [`Error::UnrecognizedFormat`] when `data` is not a container,
/// [`Error::DecryptionFailed`] when padding does not verify.
pub fn decrypt(password: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if !is_container(data) {
        return Err(Error::UnrecognizedFormat);
    }

    let (salt, ciphertext) = data[PASSPHRASE_MAGIC.len()..].split_at(PASSPHRASE_SALT_LEN);
    if ciphertext.len() % CBC_BLOCK_SIZE != 0 {
        return Err(Error::DecryptionFailed);
    }

    let derived = bytes_to_key(password, salt);
    let (key, iv) = derived.split_at(KEY_SIZE);

    Aes256CbcDec::new_from_slices(key, iv)
        .map_err(|_| Error::DecryptionFailed)?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| Error::DecryptionFailed)
}

/// Builds a passphrase container with the given salt.
pub fn encrypt(password: &[u8], plaintext: &[u8], salt: &[u8; PASSPHRASE_SALT_LEN]) -> Result<Vec<u8>> {
    let derived = bytes_to_key(password, salt);
    let (key, iv) = derived.split_at(KEY_SIZE);

    let ciphertext = Aes256CbcEnc::new_from_slices(key, iv)
        .map_err(|e| Error::Encryption(format!("invalid cbc key: {e}")))?
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = Vec::with_capacity(PASSPHRASE_MAGIC.len() + PASSPHRASE_SALT_LEN + ciphertext.len());
    out.extend_from_slice(PASSPHRASE_MAGIC);
    out.extend_from_slice(salt);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}
