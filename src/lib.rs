//! vlock - password-based encryption for messages, images and whole folders.
//!
//! Envelopes are self-contained: everything needed to decrypt them except
//! the password travels with the ciphertext.
//! - Argon2id key derivation with device-tiered costs stored in the envelope
//! - AES-256-GCM with a fresh random salt and IV per envelope
//! - Bulk archives with an encrypted manifest for selective extraction
//! - Read support for every older envelope generation (PBKDF2, passphrase AES)

pub mod bulk;
pub mod cipher;
pub mod config;
pub mod device;
pub mod error;
pub mod file;
pub mod header;
pub mod legacy;
pub mod processor;
pub mod secret;
pub mod types;

pub use error::{Error, Result};
