//! Error taxonomy for the vlock engine.
//!
//! Every decryption failure collapses into one of two user-facing messages.
//! The variants keep enough detail for diagnostics (logged, never shown) while
//! [`Error::user_message`] provides the stable surface.

use thiserror::Error;

/// Shown for any envelope that cannot be parsed or is not recognised.
pub const MESSAGE_INVALID_FILE: &str = "not a valid encrypted file";

/// Shown for every authentication failure.
pub const MESSAGE_WRONG_PASSWORD: &str = "wrong password or corrupted data";

/// Shown when a bulk archive manifest cannot be opened.
pub const MESSAGE_INVALID_MANIFEST: &str = "failed to decrypt manifest - wrong password or corrupted file";

/// Shown for encryption-side failures.
pub const MESSAGE_ENCRYPTION_FAILED: &str = "encryption failed";

#[derive(Error, Debug)]
pub enum Error {
    /// Header recognised but the body is inconsistent with its length fields.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// No known header and no legacy form matched.
    #[error("unrecognized envelope format")]
    UnrecognizedFormat,

    /// Argon2id or PBKDF2 could not produce a key.
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    /// AEAD or CBC encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Authentication failed. Wrong password and corrupted data are deliberately indistinguishable.
    #[error("decryption failed")]
    DecryptionFailed,

    /// The bulk manifest did not decrypt to a valid folder manifest.
    #[error("invalid bulk manifest: {0}")]
    InvalidManifest(String),

    /// Argon2 parameters outside the accepted range.
    #[error("invalid key derivation parameters: {0}")]
    InvalidParameters(String),

    /// Caller supplied input the engine refuses to process.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A blocking worker was cancelled or panicked.
    #[error("background task failed: {0}")]
    Task(String),
}

impl Error {
    /// Returns the message safe to present to an end user.
    ///
    /// Decryption failures never reveal which check failed.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::MalformedEnvelope(_) | Self::UnrecognizedFormat => MESSAGE_INVALID_FILE,
            Self::DecryptionFailed => MESSAGE_WRONG_PASSWORD,
            Self::InvalidManifest(_) => MESSAGE_INVALID_MANIFEST,
            Self::KeyDerivation(_) | Self::Encryption(_) | Self::InvalidParameters(_) | Self::InvalidInput(_) | Self::Task(_) => MESSAGE_ENCRYPTION_FAILED,
        }
    }

    /// True for the failures a caller may answer by retrying encryption on the PBKDF2 path.
    pub fn is_key_derivation(&self) -> bool {
        matches!(self, Self::KeyDerivation(_))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Task(err.to_string())
    }
}

/// Result type for vlock engine operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decryption_failures_share_one_message() {
        assert_eq!(Error::DecryptionFailed.user_message(), MESSAGE_WRONG_PASSWORD);
        assert_eq!(Error::DecryptionFailed.to_string(), "decryption failed");
    }

    #[test]
    fn test_format_failures_share_one_message() {
        assert_eq!(Error::UnrecognizedFormat.user_message(), MESSAGE_INVALID_FILE);
        assert_eq!(Error::MalformedEnvelope("params length 900 exceeds buffer".into()).user_message(), MESSAGE_INVALID_FILE);
    }

    #[test]
    fn test_manifest_message() {
        assert_eq!(Error::InvalidManifest("missing files".into()).user_message(), MESSAGE_INVALID_MANIFEST);
    }

    #[test]
    fn test_key_derivation_flag() {
        assert!(Error::KeyDerivation("out of memory".into()).is_key_derivation());
        assert!(!Error::DecryptionFailed.is_key_derivation());
    }
}
