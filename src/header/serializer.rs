//! Binary envelope serialization.
//!
//! All length fields are little-endian `u32`. Bodies are written exactly as
//! the deserializer expects them, byte for byte:
//!
//! ```text
//! single: header | u32 paramsLen | params JSON | salt(32) | iv(12) | ct+tag
//! bulk:   header | u32 paramsLen | params JSON | u32 manifestLen | manifest blob | file blobs...
//! native: header | salt(16) | iv(12) | ct+tag
//! ```

use crate::config::{AES_NONCE_SIZE, ARGON_SALT_LEN, HEADER_ARGON2_V2, LENGTH_FIELD_SIZE, PBKDF2_SALT_LEN};
use crate::error::{Error, Result};
use crate::header::{Argon2Params, FormatTag};

/// Encodes a single-item Argon2 v2 envelope.
///
/// # Errors
///
/// [`Error::InvalidInput`] if the salt is not 32 bytes.
pub fn encode_argon2_v2(params: &Argon2Params, salt: &[u8], iv: &[u8; AES_NONCE_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if salt.len() != ARGON_SALT_LEN {
        return Err(Error::InvalidInput(format!("expected {ARGON_SALT_LEN} bytes salt, got {}", salt.len())));
    }

    let params_json = params.to_json()?;
    let mut out = Vec::with_capacity(HEADER_ARGON2_V2.len() + LENGTH_FIELD_SIZE + params_json.len() + salt.len() + iv.len() + ciphertext.len());

    out.extend_from_slice(HEADER_ARGON2_V2);
    write_length(&mut out, params_json.len())?;
    out.extend_from_slice(&params_json);
    out.extend_from_slice(salt);
    out.extend_from_slice(iv);
    out.extend_from_slice(ciphertext);

    Ok(out)
}

/// Encodes a bulk archive from its sealed manifest and the sealed file blobs, in order.
pub fn encode_bulk<'a, I>(params: &Argon2Params, manifest_blob: &[u8], file_blobs: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let params_json = params.to_json()?;
    let mut out = Vec::with_capacity(HEADER_ARGON2_V2.len() + 2 * LENGTH_FIELD_SIZE + params_json.len() + manifest_blob.len());

    out.extend_from_slice(HEADER_ARGON2_V2);
    write_length(&mut out, params_json.len())?;
    out.extend_from_slice(&params_json);
    write_length(&mut out, manifest_blob.len())?;
    out.extend_from_slice(manifest_blob);

    for blob in file_blobs {
        out.extend_from_slice(blob);
    }

    Ok(out)
}

/// Encodes a native PBKDF2 envelope. `blob` is `salt(16) || iv(12) || ct+tag`.
///
/// # Errors
///
/// [`Error::InvalidInput`] if `tag` is not one of the native generations.
pub fn encode_native(tag: FormatTag, blob: &[u8]) -> Result<Vec<u8>> {
    let header = tag.header().filter(|_| tag.is_native()).ok_or_else(|| Error::InvalidInput(format!("{tag} is not a native format")))?;

    if blob.len() < PBKDF2_SALT_LEN + AES_NONCE_SIZE {
        return Err(Error::InvalidInput("native blob is too short".to_owned()));
    }

    let mut out = Vec::with_capacity(header.len() + blob.len());
    out.extend_from_slice(header);
    out.extend_from_slice(blob);
    Ok(out)
}

fn write_length(out: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| Error::Encryption(format!("section of {len} bytes exceeds the u32 length field")))?;
    out.extend_from_slice(&len.to_le_bytes());
    Ok(())
}
