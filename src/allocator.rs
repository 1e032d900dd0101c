//! mimalloc as the global allocator of the binary.
//!
//! Argon2id allocates and frees its full memory cost on every derivation,
//! so a bulk job churns through large blocks once per file.

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;
