//! Global Configuration Constants
//!
//! This module contains every fixed parameter of the vlock envelope formats:
//! header strings for each format generation, primitive sizes, Argon2id device
//! presets, the legacy PBKDF2 work factor and the bulk archive constants.
//!
//! Changing any value in the "wire format" sections breaks compatibility with
//! envelopes that already exist on disk.

use std::time::Duration;

/// Application name used in user interfaces.
pub const APP_NAME: &str = "vlock";

/// File extension for encrypted containers.
pub const FILE_EXTENSION: &str = ".vlock";

// === Envelope headers (wire format) ===
// Headers are ASCII prefixes. Several are prefix-extensions of one another,
// so detection must try the longest candidates first.

/// Header of the current Argon2id generation (single items and bulk archives).
pub const HEADER_ARGON2_V2: &[u8] = b"vlockprotection-systems-argon2-v2";

/// Header of native PBKDF2 files carrying an `IMAGE:` metadata prefix.
pub const HEADER_NATIVE_V1: &[u8] = b"vlockprotection-systems-native-v1";

/// Header of native PBKDF2 text envelopes.
pub const HEADER_NATIVE: &[u8] = b"vlockprotection-systems-native";

/// Header of early binary PBKDF2 files.
pub const HEADER_BINARY: &[u8] = b"vlockprotection-systems-binary";

/// Generic header used by the oldest text exports. Checked last.
pub const HEADER_GENERIC: &[u8] = b"vlockprotection-systems";

// === Inline text envelope prefixes (wire format) ===

/// Prefix of inline Argon2id strings: `v2-argon2:<mem>:<iter>:<par>:<base64>`.
pub const TEXT_PREFIX_ARGON2: &str = "v2-argon2:";

/// Prefix of inline PBKDF2 strings: `v1-pbkdf2:<base64>`.
pub const TEXT_PREFIX_PBKDF2: &str = "v1-pbkdf2:";

/// Prefix of inline native strings: `v1:<base64>`.
pub const TEXT_PREFIX_NATIVE: &str = "v1:";

// === Primitive sizes ===

/// Length of the raw AES-256 key produced by every KDF path.
pub const KEY_SIZE: usize = 32;

/// Argon2id salt length used by the v2 generation.
pub const ARGON_SALT_LEN: usize = 32;

/// PBKDF2 salt length used by the native generations.
pub const PBKDF2_SALT_LEN: usize = 16;

/// AES-GCM nonce length.
pub const AES_NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag length, appended to every ciphertext.
pub const AES_TAG_SIZE: usize = 16;

/// Width of every length field in the binary formats (little endian).
pub const LENGTH_FIELD_SIZE: usize = 4;

// === Key derivation ===

/// Argon2id output length. Fixed: the output is used directly as the AES-256 key.
pub const ARGON_HASH_LEN: u32 = 32;

/// Mobile preset memory cost in KiB.
///
/// Mobile browsers may refuse single allocations above 32 MiB, so the mobile
/// tier stays at 24 MiB.
pub const MOBILE_MEMORY: u32 = 24 * 1024;

/// Mobile preset iteration count.
pub const MOBILE_ITERATIONS: u32 = 3;

/// Desktop preset memory cost in KiB (96 MiB).
pub const DESKTOP_MEMORY: u32 = 96 * 1024;

/// Desktop preset iteration count.
pub const DESKTOP_ITERATIONS: u32 = 4;

/// Lane count shared by both presets.
pub const ARGON_PARALLELISM: u32 = 1;

/// Smallest memory cost accepted from an envelope or a caller (KiB).
pub const ARGON_MIN_MEMORY: u32 = 8;

/// Largest memory cost accepted from an envelope (4 GiB).
///
/// Parameters come from untrusted input on decryption, so an upper bound keeps
/// a crafted header from requesting an unbounded allocation.
pub const ARGON_MAX_MEMORY: u32 = 4 * 1024 * 1024;

/// Largest iteration count accepted from an envelope.
pub const ARGON_MAX_ITERATIONS: u32 = 64;

/// Largest lane count accepted from an envelope.
pub const ARGON_MAX_PARALLELISM: u32 = 16;

/// PBKDF2-HMAC-SHA256 iteration count of the native generations.
pub const PBKDF2_ITERATIONS: u32 = 600_000;

// === Metadata prefix ===

/// Marker that opens the metadata prefix of file payloads.
pub const METADATA_MARKER: &[u8] = b"IMAGE:";

/// Only this many leading plaintext bytes are scanned for the metadata prefix.
pub const METADATA_SCAN_WINDOW: usize = 100;

// === Passphrase AES (library default) ===

/// Magic that opens an OpenSSL-compatible passphrase container.
pub const PASSPHRASE_MAGIC: &[u8] = b"Salted__";

/// Salt length inside a passphrase container.
pub const PASSPHRASE_SALT_LEN: usize = 8;

/// AES-CBC block and IV length.
pub const CBC_BLOCK_SIZE: usize = 16;

// === Bulk archives ===

/// Manifest `type` value identifying a bulk folder archive.
pub const BULK_MANIFEST_TYPE: &str = "BULK_FOLDER";

/// Manifest schema version written by this implementation.
pub const BULK_MANIFEST_VERSION: &str = "2.0";

/// How long the bulk loop sleeps between pause-predicate polls.
pub const PAUSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Percentage reached once every file has been encrypted.
pub const PROGRESS_FILES_END: f64 = 80.0;

/// Percentage reached once the manifest has been encrypted.
pub const PROGRESS_MANIFEST_END: f64 = 95.0;

/// Percentage reported on completion.
pub const PROGRESS_COMPLETE: f64 = 100.0;

// === Command line ===

/// Minimum password length enforced by the interactive prompts.
///
/// The engine itself only rejects empty passwords.
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// Directory and file patterns skipped when collecting a folder for a bulk archive.
pub const EXCLUDED_PATTERNS: &[&str] = &[
    ".git",      // version control metadata
    ".DS_Store", // Finder metadata
    "Thumbs.db", // Explorer thumbnail cache
    "*.vlock",   // already encrypted containers
];
