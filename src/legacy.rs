//! Decryption routing across envelope generations.
//!
//! Format detection yields exactly one [`FormatTag`]; [`DecryptPath::for_format`]
//! maps it to the single path that may open it. There is no trial
//! decryption: the path chosen from the header is final and an
//! authentication failure on it is the answer, never a cue to try the next
//! generation.
//!
//! | Format | Path |
//! |--------|------|
//! | Argon2 v2 | Argon2id + AES-GCM, parameters from the envelope |
//! | native v1 | PBKDF2 + AES-GCM, metadata scan |
//! | native text, binary | PBKDF2 + AES-GCM |
//! | generic | inline text envelope if the body is printable, else PBKDF2 body |
//! | plain AES | passphrase container, UTF-8 plaintext required |
//! | unrecognized | rejected |

use std::sync::Arc;

use tokio::task::spawn_blocking;
use tracing::debug;

use crate::cipher::passphrase;
use crate::error::{Error, Result};
use crate::header::{FormatTag, text};
use crate::secret::Secret;

/// The one decryption path selected for an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptPath {
    /// Argon2id with the parameters stored in the envelope.
    Argon2,
    /// PBKDF2 over a native `salt(16) || iv || ct` body.
    Pbkdf2 { scan_metadata: bool },
    /// Body after the generic header; see [`GenericBody`].
    Generic,
    /// OpenSSL-style passphrase container.
    Passphrase,
    /// Nothing can open it.
    Reject,
}

impl DecryptPath {
    pub const fn for_format(tag: FormatTag) -> Self {
        match tag {
            FormatTag::Argon2V2 => Self::Argon2,
            FormatTag::NativeV1 => Self::Pbkdf2 { scan_metadata: true },
            FormatTag::NativeText | FormatTag::NativeBinary => Self::Pbkdf2 { scan_metadata: false },
            FormatTag::Generic => Self::Generic,
            FormatTag::PlainAes => Self::Passphrase,
            FormatTag::Unrecognized => Self::Reject,
        }
    }
}

/// What follows the generic header.
#[derive(Debug, PartialEq, Eq)]
pub enum GenericBody<'a> {
    /// An inline text envelope (`v1:...`, `v1-pbkdf2:...`, base64 container).
    Text(&'a str),
    /// A bare native `salt(16) || iv || ct` body.
    Native(&'a [u8]),
}

impl<'a> GenericBody<'a> {
    /// Text exports are printable ASCII end to end; anything else is binary.
    pub fn classify(body: &'a [u8]) -> Self {
        let printable = !body.is_empty() && body.iter().all(|b| b.is_ascii_graphic() || b.is_ascii_whitespace());

        match std::str::from_utf8(body) {
            Ok(text) if printable => Self::Text(text),
            _ => Self::Native(body),
        }
    }
}

/// Opens a passphrase container, raw or base64.
///
/// The container has no authentication tag, so a wrong password usually
/// surfaces as bad padding. When the padding happens to check out, the
/// plaintext is still required to be UTF-8: the only producer of this format
/// encrypted text messages.
pub async fn open_passphrase(password: Arc<Secret>, data: Vec<u8>) -> Result<Vec<u8>> {
    let container = if passphrase::is_container(&data) {
        data
    } else {
        let text = std::str::from_utf8(&data).map_err(|_| Error::UnrecognizedFormat)?;
        text::decode_base64(text.trim()).map_err(|_| Error::UnrecognizedFormat)?
    };

    let plaintext = spawn_blocking(move || passphrase::decrypt(password.expose_secret().as_bytes(), &container)).await??;

    if std::str::from_utf8(&plaintext).is_err() {
        return Err(Error::DecryptionFailed);
    }

    Ok(plaintext)
}

/// Collapses a failure on a decryption path into the public error surface.
///
/// Format and authentication errors pass through. Anything else (a KDF that
/// could not allocate, a parameter set that will not run) is reported as a
/// failed decryption, since the envelope could not be opened with this
/// password.
pub fn settle(err: Error) -> Error {
    match err {
        Error::MalformedEnvelope(_) | Error::UnrecognizedFormat | Error::DecryptionFailed | Error::InvalidManifest(_) => err,
        other => {
            debug!(error = %other, "decryption path failed");
            Error::DecryptionFailed
        }
    }
}
