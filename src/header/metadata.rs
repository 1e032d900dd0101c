//! The `IMAGE:<mime>:` metadata prefix carried inside file plaintexts.
//!
//! File payloads are encrypted as `IMAGE:<mime-type>:<raw bytes>`. After
//! decryption the first [`METADATA_SCAN_WINDOW`] bytes are scanned for the
//! prefix; without one the plaintext is a text message.
//!
//! The MIME segment ends at the first colon after the marker and may be empty
//! (`IMAGE::`). Colons in the payload are irrelevant because only the first
//! one after the marker is considered.

use crate::config::{METADATA_MARKER, METADATA_SCAN_WINDOW};
use crate::error::{Error, Result};

/// Metadata recovered from a file plaintext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    tag: String,
}

impl Metadata {
    /// Builds the metadata for `mime_type`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] when the MIME type contains a colon (it would
    /// move the boundary on decryption) or when the prefix would not fit the
    /// scan window.
    pub fn new(mime_type: &str) -> Result<Self> {
        if mime_type.contains(':') {
            return Err(Error::InvalidInput(format!("mime type must not contain ':' ({mime_type})")));
        }

        let tag = format!("IMAGE:{mime_type}:");
        if tag.len() > METADATA_SCAN_WINDOW {
            return Err(Error::InvalidInput(format!("mime type longer than {} bytes", METADATA_SCAN_WINDOW - METADATA_MARKER.len() - 1)));
        }

        Ok(Self { tag })
    }

    /// The full prefix, e.g. `IMAGE:image/png:`.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The MIME segment, possibly empty.
    pub fn mime_type(&self) -> &str {
        &self.tag[METADATA_MARKER.len()..self.tag.len() - 1]
    }

    /// Returns `tag || payload`, the plaintext that gets encrypted.
    pub fn prepend(&self, payload: &[u8]) -> Vec<u8> {
        let mut plaintext = Vec::with_capacity(self.tag.len() + payload.len());
        plaintext.extend_from_slice(self.tag.as_bytes());
        plaintext.extend_from_slice(payload);
        plaintext
    }

    /// Scans the head of a decrypted plaintext.
    ///
    /// Returns the metadata and the byte offset where the payload begins, or
    /// `None` when the plaintext carries no prefix.
    pub fn scan(plaintext: &[u8]) -> Option<(Self, usize)> {
        if !plaintext.starts_with(METADATA_MARKER) {
            return None;
        }

        let window = &plaintext[..plaintext.len().min(METADATA_SCAN_WINDOW)];
        let closing = window[METADATA_MARKER.len()..].iter().position(|&b| b == b':')?;
        let boundary = METADATA_MARKER.len() + closing + 1;

        let tag = std::str::from_utf8(&plaintext[..boundary]).ok()?;
        Some((Self { tag: tag.to_owned() }, boundary))
    }
}
