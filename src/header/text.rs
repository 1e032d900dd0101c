//! Inline text envelopes.
//!
//! When output is handed to a text transcoding layer instead of being saved
//! as a file, envelopes travel as pure ASCII strings:
//!
//! ```text
//! v2-argon2:<memory>:<iterations>:<parallelism>:<base64(salt32 || iv12 || ct+tag)>
//! v1-pbkdf2:<base64(salt16 || iv12 || ct+tag)>
//! v1:<base64(salt16 || iv12 || ct+tag)>
//! <base64("Salted__" || salt8 || aes-cbc)>
//! ```
//!
//! The prefix is the only version marker. `v1:` and `v1-pbkdf2:` share one body layout.

use std::fmt::{self, Display, Formatter};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::cipher::passphrase;
use crate::config::{TEXT_PREFIX_ARGON2, TEXT_PREFIX_NATIVE, TEXT_PREFIX_PBKDF2};
use crate::error::{Error, Result};
use crate::header::Argon2Params;

/// A parsed inline envelope. Blobs are `salt || iv || ciphertext`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEnvelope {
    Argon2 { params: Argon2Params, blob: Vec<u8> },
    Pbkdf2 { blob: Vec<u8> },
    Native { blob: Vec<u8> },
    Legacy { container: Vec<u8> },
}

impl TextEnvelope {
    /// Parses any inline form.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedEnvelope`] when a known prefix is followed by invalid
    /// fields or base64; [`Error::UnrecognizedFormat`] when there is no prefix
    /// and the string is not a passphrase container.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        if let Some(rest) = input.strip_prefix(TEXT_PREFIX_ARGON2) {
            return Self::parse_argon2(rest);
        }

        if let Some(rest) = input.strip_prefix(TEXT_PREFIX_PBKDF2) {
            return Ok(Self::Pbkdf2 { blob: decode_field(rest)? });
        }

        if let Some(rest) = input.strip_prefix(TEXT_PREFIX_NATIVE) {
            return Ok(Self::Native { blob: decode_field(rest)? });
        }

        match decode_base64(input) {
            Ok(container) if passphrase::is_container(&container) => Ok(Self::Legacy { container }),
            _ => Err(Error::UnrecognizedFormat),
        }
    }

    fn parse_argon2(rest: &str) -> Result<Self> {
        let mut fields = rest.splitn(4, ':');
        let mut next_number = |name: &str| -> Result<u32> {
            fields
                .next()
                .and_then(|field| field.parse::<u32>().ok())
                .ok_or_else(|| Error::MalformedEnvelope(format!("missing or invalid {name} field")))
        };

        let memory = next_number("memory")?;
        let iterations = next_number("iterations")?;
        let parallelism = next_number("parallelism")?;
        let params = Argon2Params::new(memory, iterations, parallelism);
        params.validate().map_err(|e| Error::MalformedEnvelope(e.to_string()))?;

        let payload = fields.next().ok_or_else(|| Error::MalformedEnvelope("missing payload".to_owned()))?;
        Ok(Self::Argon2 { params, blob: decode_field(payload)? })
    }
}

impl Display for TextEnvelope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argon2 { params, blob } => {
                write!(f, "{TEXT_PREFIX_ARGON2}{}:{}:{}:{}", params.memory, params.iterations, params.parallelism, STANDARD.encode(blob))
            }
            Self::Pbkdf2 { blob } => write!(f, "{TEXT_PREFIX_PBKDF2}{}", STANDARD.encode(blob)),
            Self::Native { blob } => write!(f, "{TEXT_PREFIX_NATIVE}{}", STANDARD.encode(blob)),
            Self::Legacy { container } => f.write_str(&STANDARD.encode(container)),
        }
    }
}

/// Decodes standard base64, ignoring ASCII whitespace introduced by line wrapping.
pub fn decode_base64(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    let compact: String = input.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

fn decode_field(field: &str) -> Result<Vec<u8>> {
    decode_base64(field).map_err(|e| Error::MalformedEnvelope(format!("invalid base64 payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argon2_format() {
        let envelope = TextEnvelope::Argon2 { params: Argon2Params::new(98_304, 4, 1), blob: vec![0u8; 3] };
        assert_eq!(envelope.to_string(), "v2-argon2:98304:4:1:AAAA");
    }

    #[test]
    fn test_parse_argon2() {
        let parsed = TextEnvelope::parse("v2-argon2:24576:3:1:AQID").unwrap();
        assert_eq!(parsed, TextEnvelope::Argon2 { params: Argon2Params::new(24_576, 3, 1), blob: vec![1, 2, 3] });
    }

    #[test]
    fn test_parse_argon2_bad_fields() {
        assert!(matches!(TextEnvelope::parse("v2-argon2:lots:3:1:AQID"), Err(Error::MalformedEnvelope(_))));
        assert!(matches!(TextEnvelope::parse("v2-argon2:24576:3"), Err(Error::MalformedEnvelope(_))));
        assert!(matches!(TextEnvelope::parse("v2-argon2:24576:0:1:AQID"), Err(Error::MalformedEnvelope(_))));
        assert!(matches!(TextEnvelope::parse("v2-argon2:24576:3:1:***"), Err(Error::MalformedEnvelope(_))));
    }

    #[test]
    fn test_parse_native_prefixes() {
        assert_eq!(TextEnvelope::parse("v1-pbkdf2:AQID").unwrap(), TextEnvelope::Pbkdf2 { blob: vec![1, 2, 3] });
        assert_eq!(TextEnvelope::parse("v1:AQID").unwrap(), TextEnvelope::Native { blob: vec![1, 2, 3] });
    }

    #[test]
    fn test_parse_legacy() {
        let container = passphrase::encrypt(b"pw", b"hi", &[2u8; 8]).unwrap();
        let text = TextEnvelope::Legacy { container: container.clone() }.to_string();
        assert!(text.starts_with("U2FsdGVkX1"));
        assert_eq!(TextEnvelope::parse(&text).unwrap(), TextEnvelope::Legacy { container });
    }

    #[test]
    fn test_parse_unrecognized() {
        assert!(matches!(TextEnvelope::parse("hello world"), Err(Error::UnrecognizedFormat)));
        assert!(matches!(TextEnvelope::parse("AQID"), Err(Error::UnrecognizedFormat)));
    }

    #[test]
    fn test_output_is_ascii() {
        let envelope = TextEnvelope::Pbkdf2 { blob: (0..=255).collect() };
        assert!(envelope.to_string().is_ascii());
    }

    #[test]
    fn test_decode_base64_ignores_wrapping() {
        assert_eq!(decode_base64("AQ\nID").unwrap(), vec![1, 2, 3]);
    }
}
