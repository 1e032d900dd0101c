//! Bulk folder archives.
//!
//! A bulk archive packs many files under one password. Each file is sealed
//! on its own with a fresh salt and IV, and an encrypted manifest records
//! where every sealed blob lives:
//!
//! ```text
//! header | u32 paramsLen | params | u32 manifestLen | manifest blob | blob_1 | blob_2 | ...
//! ```
//!
//! Because every blob is independent, any single entry can be decrypted
//! from the manifest alone without touching the other files.
//!
//! Files are processed strictly one after another. Argon2id allocates its
//! full memory cost per derivation, and running derivations side by side
//! would multiply peak memory by the number of files in flight.

mod archive;
mod extract;
mod manifest;
mod progress;

pub use archive::BulkInput;
pub use extract::{ExtractedFile, Opened, OpenedArchive};
pub use manifest::{BulkManifest, FileEntry, MIN_FILE_BLOB};
pub use progress::{NeverPaused, PauseSignal, Phase, Progress, ProgressSink};
