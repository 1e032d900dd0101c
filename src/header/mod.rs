//! Envelope codec.
//!
//! An envelope is the self-contained encrypted unit: a header naming its
//! format generation followed by a generation-specific body.
//!
//! # Generations
//!
//! | Tag | Header | Body |
//! |-----|--------|------|
//! | [`FormatTag::Argon2V2`] | `vlockprotection-systems-argon2-v2` | `u32 paramsLen, params JSON, salt(32), iv(12), ct+tag` |
//! | [`FormatTag::NativeV1`] | `vlockprotection-systems-native-v1` | `salt(16), iv(12), ct+tag`, plaintext carries `IMAGE:` |
//! | [`FormatTag::NativeText`] | `vlockprotection-systems-native` | `salt(16), iv(12), ct+tag` |
//! | [`FormatTag::NativeBinary`] | `vlockprotection-systems-binary` | `salt(16), iv(12), ct+tag` |
//! | [`FormatTag::Generic`] | `vlockprotection-systems` | inline text envelope, or a native body |
//! | [`FormatTag::PlainAes`] | none | passphrase AES container, raw or base64 |
//!
//! Several headers are prefix-extensions of `vlockprotection-systems`, so
//! detection tries the longest header first and stops at the first match.
//! Only the start of the buffer is examined: a header string appearing later
//! in the data never influences classification.

use strum::Display;
use tracing::debug;

use crate::cipher::passphrase;
use crate::config::{HEADER_ARGON2_V2, HEADER_BINARY, HEADER_GENERIC, HEADER_NATIVE, HEADER_NATIVE_V1};

pub mod deserializer;
pub mod metadata;
pub mod parameter;
pub mod serializer;
pub mod text;

pub use deserializer::{Argon2Body, BulkLayout, decode_argon2_v2, decode_bulk, decode_native};
pub use metadata::Metadata;
pub use parameter::Argon2Params;
pub use serializer::{encode_argon2_v2, encode_bulk, encode_native};
pub use text::TextEnvelope;

/// Envelope generation, identified from the leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FormatTag {
    /// Argon2id + AES-GCM, parameters embedded. Single items and bulk archives.
    Argon2V2,
    /// PBKDF2 + AES-GCM file with an `IMAGE:` metadata prefix.
    NativeV1,
    /// PBKDF2 + AES-GCM text.
    NativeText,
    /// PBKDF2 + AES-GCM, early binary exports.
    NativeBinary,
    /// Oldest header. Followed by an inline text envelope or a native body.
    Generic,
    /// No header: an OpenSSL-style passphrase AES container.
    PlainAes,
    /// Nothing matched.
    Unrecognized,
}

/// Headers in detection priority order: longest first.
const HEADERS: [(&[u8], FormatTag); 5] = [
    (HEADER_ARGON2_V2, FormatTag::Argon2V2),
    (HEADER_NATIVE_V1, FormatTag::NativeV1),
    (HEADER_NATIVE, FormatTag::NativeText),
    (HEADER_BINARY, FormatTag::NativeBinary),
    (HEADER_GENERIC, FormatTag::Generic),
];

impl FormatTag {
    /// The header bytes of this generation, if it has one.
    pub fn header(self) -> Option<&'static [u8]> {
        HEADERS.iter().find(|(_, tag)| *tag == self).map(|(header, _)| *header)
    }

    /// True for the PBKDF2 generations sharing the `salt(16) || iv || ct` body.
    pub const fn is_native(self) -> bool {
        matches!(self, Self::NativeV1 | Self::NativeText | Self::NativeBinary)
    }
}

/// Classifies an envelope by its leading bytes.
///
/// Exactly one tag matches any buffer. Buffers without a header are
/// [`FormatTag::PlainAes`] only if they hold a passphrase container, raw or
/// base64 encoded; everything else is [`FormatTag::Unrecognized`].
pub fn detect_format(bytes: &[u8]) -> FormatTag {
    let tag = HEADERS
        .iter()
        .find(|(header, _)| bytes.starts_with(header))
        .map(|(_, tag)| *tag)
        .unwrap_or_else(|| if looks_like_passphrase_container(bytes) { FormatTag::PlainAes } else { FormatTag::Unrecognized });

    debug!(format = %tag, size = bytes.len(), "detected envelope format");
    tag
}

/// Strips the header of `tag` from `bytes`.
pub fn body(bytes: &[u8], tag: FormatTag) -> &[u8] {
    tag.header().map_or(bytes, |header| bytes.get(header.len()..).unwrap_or_default())
}

fn looks_like_passphrase_container(bytes: &[u8]) -> bool {
    if passphrase::is_container(bytes) {
        return true;
    }

    std::str::from_utf8(bytes).ok().and_then(|s| text::decode_base64(s.trim()).ok()).is_some_and(|raw| passphrase::is_container(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::passphrase;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    #[test]
    fn test_detect_each_header() {
        assert_eq!(detect_format(b"vlockprotection-systems-argon2-v2\x40\0\0\0"), FormatTag::Argon2V2);
        assert_eq!(detect_format(b"vlockprotection-systems-native-v1...."), FormatTag::NativeV1);
        assert_eq!(detect_format(b"vlockprotection-systems-native...."), FormatTag::NativeText);
        assert_eq!(detect_format(b"vlockprotection-systems-binary...."), FormatTag::NativeBinary);
        assert_eq!(detect_format(b"vlockprotection-systemsv1:AAAA"), FormatTag::Generic);
    }

    #[test]
    fn test_argon2_wins_over_embedded_headers() {
        let mut bytes = HEADER_ARGON2_V2.to_vec();
        bytes.extend_from_slice(HEADER_NATIVE_V1);
        bytes.extend_from_slice(HEADER_NATIVE);
        assert_eq!(detect_format(&bytes), FormatTag::Argon2V2);
    }

    #[test]
    fn test_header_only_matches_at_start() {
        let mut bytes = b"junk".to_vec();
        bytes.extend_from_slice(HEADER_ARGON2_V2);
        assert_eq!(detect_format(&bytes), FormatTag::Unrecognized);
    }

    #[test]
    fn test_detect_passphrase_container() {
        let raw = passphrase::encrypt(b"pw", b"old", &[1u8; 8]).unwrap();
        assert_eq!(detect_format(&raw), FormatTag::PlainAes);
        assert_eq!(detect_format(STANDARD.encode(&raw).as_bytes()), FormatTag::PlainAes);
    }

    #[test]
    fn test_detect_garbage() {
        assert_eq!(detect_format(b""), FormatTag::Unrecognized);
        assert_eq!(detect_format(b"\x89PNG\r\n\x1a\n"), FormatTag::Unrecognized);
        assert_eq!(detect_format(b"just some words"), FormatTag::Unrecognized);
    }

    #[test]
    fn test_body_strips_header() {
        let bytes = b"vlockprotection-systems-native-v1BODY";
        assert_eq!(body(bytes, FormatTag::NativeV1), b"BODY");
        assert_eq!(body(b"raw", FormatTag::PlainAes), b"raw");
    }

    #[test]
    fn test_header_lookup() {
        assert_eq!(FormatTag::Argon2V2.header(), Some(HEADER_ARGON2_V2));
        assert_eq!(FormatTag::PlainAes.header(), None);
        assert!(FormatTag::NativeBinary.is_native());
        assert!(!FormatTag::Generic.is_native());
    }
}
