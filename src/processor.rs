//! Single-item encryption and decryption.
//!
//! A [`Processor`] holds one password and turns messages or file payloads
//! into self-contained envelopes and back. New envelopes are always written
//! in the Argon2 v2 generation unless a caller explicitly asks for the PBKDF2
//! fallback forms; decryption accepts every generation through the routing
//! in [`crate::legacy`].

use std::sync::Arc;

use tracing::{debug, info};
use zeroize::Zeroize;

use crate::cipher::{self, Kdf};
use crate::error::{Error, Result};
use crate::header::{Argon2Params, FormatTag, Metadata, TextEnvelope, decode_argon2_v2, decode_native, detect_format, encode_argon2_v2, encode_native};
use crate::legacy::{DecryptPath, GenericBody, open_passphrase, settle};
use crate::secret::{Secret, SecretBytes};

/// Result of a successful decryption.
#[derive(Debug)]
pub struct Decrypted {
    /// Plaintext with any `IMAGE:` prefix removed.
    pub payload: Vec<u8>,
    /// Present when the plaintext carried a metadata prefix.
    pub metadata: Option<Metadata>,
    /// Generation the envelope was written in.
    pub format: FormatTag,
}

impl Decrypted {
    fn new(mut plaintext: Vec<u8>, format: FormatTag, scan_metadata: bool) -> Self {
        if scan_metadata && let Some((metadata, boundary)) = Metadata::scan(&plaintext) {
            // Shift the payload over the prefix in place and wipe the stale tail.
            let len = plaintext.len() - boundary;
            plaintext.copy_within(boundary.., 0);
            plaintext[len..].zeroize();
            plaintext.truncate(len);
            return Self { payload: plaintext, metadata: Some(metadata), format };
        }

        Self { payload: plaintext, metadata: None, format }
    }

    /// True when the plaintext is a message rather than a file.
    pub fn is_text(&self) -> bool {
        self.metadata.is_none()
    }

    /// The payload as UTF-8, if it is.
    pub fn as_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}

pub struct Processor {
    password: Arc<Secret>,
}

impl Processor {
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for an empty password.
    pub fn new(password: Secret) -> Result<Self> {
        if password.is_empty() {
            return Err(Error::InvalidInput("password must not be empty".to_owned()));
        }

        Ok(Self { password: Arc::new(password) })
    }

    pub(crate) fn password(&self) -> Arc<Secret> {
        self.password.clone()
    }

    /// Encrypts a text message into a binary Argon2 v2 envelope.
    pub async fn encrypt_message(&self, message: &str, params: Argon2Params) -> Result<Vec<u8>> {
        self.seal_argon2(SecretBytes::new(message.as_bytes()), params).await
    }

    /// Encrypts a text message into a `v2-argon2:` inline string.
    pub async fn encrypt_message_text(&self, message: &str, params: Argon2Params) -> Result<String> {
        params.validate()?;
        let blob = cipher::seal(self.password.clone(), Kdf::Argon2id(params), SecretBytes::new(message.as_bytes())).await?;
        Ok(TextEnvelope::Argon2 { params, blob }.to_string())
    }

    /// Encrypts a file payload tagged with its MIME type.
    ///
    /// The envelope plaintext is `IMAGE:<mime>:<bytes>`.
    pub async fn encrypt_file(&self, bytes: &[u8], mime_type: &str, params: Argon2Params) -> Result<Vec<u8>> {
        let plaintext = SecretBytes::from_vec(Metadata::new(mime_type)?.prepend(bytes));
        self.seal_argon2(plaintext, params).await
    }

    /// Encrypts a text message into a `v1-pbkdf2:` inline string.
    ///
    /// For hosts where Argon2 cannot run at all.
    pub async fn encrypt_message_pbkdf2(&self, message: &str) -> Result<String> {
        let blob = cipher::seal(self.password.clone(), Kdf::Pbkdf2, SecretBytes::new(message.as_bytes())).await?;
        Ok(TextEnvelope::Pbkdf2 { blob }.to_string())
    }

    /// Encrypts a file payload into a native v1 PBKDF2 envelope.
    pub async fn encrypt_file_native(&self, bytes: &[u8], mime_type: &str) -> Result<Vec<u8>> {
        let plaintext = SecretBytes::from_vec(Metadata::new(mime_type)?.prepend(bytes));
        let blob = cipher::seal(self.password.clone(), Kdf::Pbkdf2, plaintext).await?;
        encode_native(FormatTag::NativeV1, &blob)
    }

    async fn seal_argon2(&self, plaintext: SecretBytes, params: Argon2Params) -> Result<Vec<u8>> {
        params.validate()?;
        debug!(memory = params.memory, iterations = params.iterations, size = plaintext.len(), "sealing argon2 envelope");

        let blob = cipher::seal(self.password.clone(), Kdf::Argon2id(params), plaintext).await?;
        let (salt, iv, ciphertext) = cipher::split_blob(&blob, Kdf::Argon2id(params).salt_len())?;
        encode_argon2_v2(&params, salt, iv, ciphertext)
    }

    /// Decrypts a binary envelope of any generation.
    ///
    /// # Errors
    ///
    /// [`Error::UnrecognizedFormat`] or [`Error::MalformedEnvelope`] when the
    /// envelope cannot be parsed, [`Error::DecryptionFailed`] for a wrong
    /// password or corrupted data.
    pub async fn decrypt(&self, envelope: &[u8]) -> Result<Decrypted> {
        let format = detect_format(envelope);
        let path = DecryptPath::for_format(format);
        info!(%format, "decrypting envelope");

        match path {
            DecryptPath::Argon2 => {
                let body = decode_argon2_v2(envelope)?;
                let kdf = Kdf::Argon2id(body.params);
                let blob = &envelope[envelope.len() - body.blob_len()..];
                let plaintext = cipher::open(self.password.clone(), kdf, blob).await.map_err(settle)?;
                Ok(Decrypted::new(plaintext, format, true))
            }
            DecryptPath::Pbkdf2 { scan_metadata } => {
                let body = decode_native(envelope, format)?;
                let plaintext = cipher::open(self.password.clone(), Kdf::Pbkdf2, body).await.map_err(settle)?;
                Ok(Decrypted::new(plaintext, format, scan_metadata))
            }
            DecryptPath::Generic => match GenericBody::classify(crate::header::body(envelope, format)) {
                GenericBody::Text(text) => self.decrypt_text(text).await,
                GenericBody::Native(body) => {
                    let plaintext = cipher::open(self.password.clone(), Kdf::Pbkdf2, body).await.map_err(settle)?;
                    Ok(Decrypted::new(plaintext, format, false))
                }
            },
            DecryptPath::Passphrase => {
                let plaintext = open_passphrase(self.password.clone(), envelope.to_vec()).await.map_err(settle)?;
                Ok(Decrypted::new(plaintext, format, false))
            }
            DecryptPath::Reject => Err(Error::UnrecognizedFormat),
        }
    }

    /// Decrypts an inline text envelope.
    pub async fn decrypt_text(&self, input: &str) -> Result<Decrypted> {
        let (format, kdf, blob) = match TextEnvelope::parse(input)? {
            TextEnvelope::Argon2 { params, blob } => (FormatTag::Argon2V2, Kdf::Argon2id(params), blob),
            TextEnvelope::Pbkdf2 { blob } | TextEnvelope::Native { blob } => (FormatTag::NativeText, Kdf::Pbkdf2, blob),
            TextEnvelope::Legacy { container } => {
                let plaintext = open_passphrase(self.password.clone(), container).await.map_err(settle)?;
                return Ok(Decrypted::new(plaintext, FormatTag::PlainAes, false));
            }
        };

        let plaintext = cipher::open(self.password.clone(), kdf, &blob).await.map_err(settle)?;
        Ok(Decrypted::new(plaintext, format, format == FormatTag::Argon2V2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::passphrase;
    use crate::config::{HEADER_ARGON2_V2, HEADER_GENERIC, HEADER_NATIVE};

    const CHEAP: Argon2Params = Argon2Params::new(1024, 1, 1);

    fn processor(password: &str) -> Processor {
        Processor::new(Secret::new(password)).unwrap()
    }

    #[tokio::test]
    async fn test_message_roundtrip() {
        let p = processor("test_password_123");
        let envelope = p.encrypt_message("Hello, World!", CHEAP).await.unwrap();
        assert!(envelope.starts_with(HEADER_ARGON2_V2));

        let decrypted = p.decrypt(&envelope).await.unwrap();
        assert_eq!(decrypted.as_text(), Some("Hello, World!"));
        assert!(decrypted.metadata.is_none());
        assert_eq!(decrypted.format, FormatTag::Argon2V2);
    }

    #[tokio::test]
    async fn test_file_roundtrip_with_metadata() {
        let p = processor("pw");
        let png = [0x89, b'P', b'N', b'G', 0, 1, 2, b':', 3];
        let envelope = p.encrypt_file(&png, "image/png", CHEAP).await.unwrap();

        let decrypted = p.decrypt(&envelope).await.unwrap();
        assert_eq!(decrypted.payload, png);
        assert_eq!(decrypted.metadata.unwrap().mime_type(), "image/png");
    }

    #[test]
    fn test_metadata_stripped_in_place() {
        let plaintext = b"IMAGE:image/png:\x89PNG".to_vec();
        let buffer = plaintext.as_ptr();

        let decrypted = Decrypted::new(plaintext, FormatTag::Argon2V2, true);
        assert_eq!(decrypted.payload, b"\x89PNG");
        assert_eq!(decrypted.payload.as_ptr(), buffer);
        assert_eq!(decrypted.metadata.unwrap().mime_type(), "image/png");
    }

    #[tokio::test]
    async fn test_empty_message() {
        let p = processor("pw");
        let envelope = p.encrypt_message("", CHEAP).await.unwrap();
        assert!(p.decrypt(&envelope).await.unwrap().payload.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let envelope = processor("correct_password").encrypt_message("secret", CHEAP).await.unwrap();
        let result = processor("wrong_password").decrypt(&envelope).await;
        assert!(matches!(result, Err(Error::DecryptionFailed)));
    }

    #[tokio::test]
    async fn test_flipped_byte_fails_authentication() {
        let p = processor("pw");
        let mut envelope = p.encrypt_message("tamper with me", CHEAP).await.unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0x01;
        assert!(matches!(p.decrypt(&envelope).await, Err(Error::DecryptionFailed)));
    }

    #[tokio::test]
    async fn test_text_roundtrip() {
        let p = processor("pw");
        let text = p.encrypt_message_text("inline", CHEAP).await.unwrap();
        assert!(text.starts_with("v2-argon2:1024:1:1:"));
        assert_eq!(p.decrypt_text(&text).await.unwrap().as_text(), Some("inline"));
    }

    #[tokio::test]
    async fn test_native_file_roundtrip() {
        let p = processor("pw");
        let envelope = p.encrypt_file_native(b"GIF89a", "image/gif").await.unwrap();
        assert_eq!(detect_format(&envelope), FormatTag::NativeV1);

        let decrypted = p.decrypt(&envelope).await.unwrap();
        assert_eq!(decrypted.payload, b"GIF89a");
        assert_eq!(decrypted.metadata.unwrap().mime_type(), "image/gif");
    }

    #[tokio::test]
    async fn test_pbkdf2_text_roundtrip() {
        let p = processor("pw");
        let text = p.encrypt_message_pbkdf2("fallback").await.unwrap();
        assert!(text.starts_with("v1-pbkdf2:"));
        assert_eq!(p.decrypt_text(&text).await.unwrap().as_text(), Some("fallback"));
    }

    #[tokio::test]
    async fn test_native_text_header_without_metadata_scan() {
        let p = processor("pw");
        let blob = cipher::seal(p.password.clone(), Kdf::Pbkdf2, SecretBytes::new(b"IMAGE:x:not a file")).await.unwrap();
        let mut envelope = HEADER_NATIVE.to_vec();
        envelope.extend_from_slice(&blob);

        let decrypted = p.decrypt(&envelope).await.unwrap();
        assert_eq!(decrypted.format, FormatTag::NativeText);
        assert!(decrypted.metadata.is_none());
        assert_eq!(decrypted.payload, b"IMAGE:x:not a file");
    }

    #[tokio::test]
    async fn test_generic_header_with_inline_body() {
        let p = processor("pw");
        let inline = p.encrypt_message_pbkdf2("from the old days").await.unwrap();
        let mut envelope = HEADER_GENERIC.to_vec();
        envelope.extend_from_slice(inline.as_bytes());

        assert_eq!(p.decrypt(&envelope).await.unwrap().as_text(), Some("from the old days"));
    }

    #[tokio::test]
    async fn test_passphrase_container() {
        let container = passphrase::encrypt(b"pw", b"legacy text", &[9u8; 8]).unwrap();
        let decrypted = processor("pw").decrypt(&container).await.unwrap();
        assert_eq!(decrypted.format, FormatTag::PlainAes);
        assert_eq!(decrypted.as_text(), Some("legacy text"));
    }

    #[tokio::test]
    async fn test_unrecognized() {
        let result = processor("pw").decrypt(b"definitely not an envelope").await;
        assert!(matches!(result, Err(Error::UnrecognizedFormat)));
    }

    #[tokio::test]
    async fn test_rejects_colon_mime() {
        let result = processor("pw").encrypt_file(b"x", "image:png", CHEAP).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_empty_password() {
        assert!(matches!(Processor::new(Secret::new("")), Err(Error::InvalidInput(_))));
    }
}
