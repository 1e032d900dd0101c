//! Common type definitions shared by file discovery and the terminal UI.

use std::fmt::{Display, Formatter, Result};

/// Direction of a single-file operation.
///
/// Used to filter files during discovery and to derive output paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorMode {
    /// Encrypt the file, producing a `.vlock` output.
    Encrypt,

    /// Decrypt the file, removing the `.vlock` extension.
    Decrypt,
}

impl ProcessorMode {
    pub const ALL: &'static [Self] = &[Self::Encrypt, Self::Decrypt];

    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            Self::Encrypt => "Encrypt",
            Self::Decrypt => "Decrypt",
        }
    }

    /// Past tense, for result messages.
    #[inline]
    pub fn done(self) -> &'static str {
        match self {
            Self::Encrypt => "encrypted",
            Self::Decrypt => "decrypted",
        }
    }
}

impl Display for ProcessorMode {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(ProcessorMode::ALL.iter().map(ToString::to_string).collect::<Vec<_>>(), ["Encrypt", "Decrypt"]);
        assert_eq!(ProcessorMode::Decrypt.done(), "decrypted");
    }
}
