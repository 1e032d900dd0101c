//! Filesystem side of the CLI.
//!
//! The engine only ever sees byte buffers. This module turns paths into
//! buffers and back: single files, whole folders collected for a bulk
//! archive, and the directory tree rebuilt when an archive is extracted.
//!
//! ## Safety
//!
//! - Folder collection skips hidden files, VCS metadata and `.vlock` files
//! - Extracted paths are joined under the output root only; absolute paths
//!   and `..` components are refused even though the manifest was validated
//! - Outputs never silently replace an existing file unless asked to

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail, ensure};
use fast_glob::glob_match;
use tokio::fs;
use walkdir::WalkDir;

use crate::bulk::BulkInput;
use crate::config::{EXCLUDED_PATTERNS, FILE_EXTENSION};
use crate::types::ProcessorMode;

static EXCLUSION_MATCHERS: LazyLock<Vec<String>> = LazyLock::new(|| EXCLUDED_PATTERNS.iter().map(|s| (*s).to_owned()).collect());

/// MIME types recognised from the file extension.
const MIME_TYPES: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("json", "application/json"),
    ("zip", "application/zip"),
    ("mp4", "video/mp4"),
    ("mp3", "audio/mpeg"),
];

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Final path component, for display.
    pub fn name(&self) -> String {
        self.path.file_name().map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }

    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.path.as_os_str().to_string_lossy().ends_with(FILE_EXTENSION)
    }

    #[inline]
    pub fn is_hidden(&self) -> bool {
        self.path.file_name().is_some_and(|name| name.to_string_lossy().starts_with('.'))
    }

    pub fn is_excluded(&self) -> bool {
        let path_str = self.path.to_string_lossy();

        EXCLUSION_MATCHERS.iter().any(|pattern| {
            if glob_match(pattern.as_str(), &*path_str) {
                return true;
            }

            self.path.components().any(|comp| glob_match(pattern.as_str(), &*comp.as_os_str().to_string_lossy()))
        })
    }

    pub fn is_eligible(&self, mode: ProcessorMode) -> bool {
        if self.is_hidden() {
            return false;
        }

        // `*.vlock` is itself an exclusion pattern, so decryption only checks the extension.
        match mode {
            ProcessorMode::Encrypt => !self.is_encrypted() && !self.is_excluded(),
            ProcessorMode::Decrypt => self.is_encrypted(),
        }
    }

    pub fn output_path(&self, mode: ProcessorMode) -> PathBuf {
        match mode {
            ProcessorMode::Encrypt => {
                let mut name = self.path.as_os_str().to_os_string();
                name.push(FILE_EXTENSION);
                PathBuf::from(name)
            }
            ProcessorMode::Decrypt => self.path.to_string_lossy().strip_suffix(FILE_EXTENSION).map_or_else(|| self.path.with_extension("out"), PathBuf::from),
        }
    }

    /// Guesses the MIME type from the extension.
    pub fn mime_type(&self) -> &'static str {
        let extension = self.path.extension().map(|e| e.to_string_lossy().to_ascii_lowercase()).unwrap_or_default();
        MIME_TYPES.iter().find(|(ext, _)| *ext == extension).map_or(DEFAULT_MIME_TYPE, |(_, mime)| *mime)
    }

    pub async fn read(&self) -> Result<Vec<u8>> {
        fs::read(&self.path).await.with_context(|| format!("failed to read file: {}", self.path.display()))
    }

    /// Writes `bytes`, creating parent directories as needed.
    pub async fn write(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        fs::write(&self.path, bytes).await.with_context(|| format!("failed to write file: {}", self.path.display()))
    }

    /// Input files must exist and be regular files; outputs must not exist unless `overwrite`.
    pub fn validate(&self, must_exist: bool, overwrite: bool) -> Result<()> {
        if must_exist {
            ensure!(self.path.exists(), "file not found: {}", self.path.display());
            ensure!(!self.path.is_dir(), "path is a directory: {}", self.path.display());
        } else {
            ensure!(overwrite || !self.path.exists(), "file already exists: {}", self.path.display());
        }

        Ok(())
    }

    /// Files in the current directory tree eligible for `mode`.
    pub fn discover(mode: ProcessorMode) -> Vec<Self> {
        WalkDir::new(".")
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| Self::new(entry.into_path()))
            .filter(|file| file.is_eligible(mode))
            .collect()
    }
}

/// Reads every eligible file under `root` for a bulk archive.
///
/// Files are visited in file-name order so the archive layout is stable.
/// Relative paths use `/` regardless of platform.
pub async fn collect_folder(root: &Path) -> Result<Vec<BulkInput>> {
    ensure!(root.is_dir(), "not a directory: {}", root.display());

    let mut inputs = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).with_context(|| format!("{} escapes {}", entry.path().display(), root.display()))?;
        let file = File::new(relative);
        if file.is_hidden() || file.is_excluded() || relative.components().any(|c| c.as_os_str().to_string_lossy().starts_with('.')) {
            continue;
        }

        let relative_path = relative.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/");
        let bytes = File::new(entry.path()).read().await?;
        inputs.push(BulkInput { name: file.name(), relative_path, bytes });
    }

    ensure!(!inputs.is_empty(), "no files to archive in {}", root.display());
    Ok(inputs)
}

/// Resolves an archive member path under `root`.
pub fn safe_join(root: &Path, relative: &str) -> Result<PathBuf> {
    let mut path = root.to_path_buf();

    for component in Path::new(&relative.replace('\\', "/")).components() {
        match component {
            Component::Normal(part) => path.push(part),
            Component::CurDir => {}
            _ => bail!("refusing to extract outside the output directory: {relative}"),
        }
    }

    ensure!(path != root, "empty archive path");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_output_path() {
        let file = File::new("photo.png");
        assert_eq!(file.output_path(ProcessorMode::Encrypt), PathBuf::from("photo.png.vlock"));
        assert_eq!(File::new("photo.png.vlock").output_path(ProcessorMode::Decrypt), PathBuf::from("photo.png"));
    }

    #[test]
    fn test_eligibility() {
        assert!(File::new("notes.txt").is_eligible(ProcessorMode::Encrypt));
        assert!(!File::new("notes.txt.vlock").is_eligible(ProcessorMode::Encrypt));
        assert!(File::new("notes.txt.vlock").is_eligible(ProcessorMode::Decrypt));
        assert!(!File::new(".env").is_eligible(ProcessorMode::Encrypt));
        assert!(!File::new("repo/.git/config").is_eligible(ProcessorMode::Encrypt));
    }

    #[test]
    fn test_mime_type() {
        assert_eq!(File::new("a.PNG").mime_type(), "image/png");
        assert_eq!(File::new("a.jpeg").mime_type(), "image/jpeg");
        assert_eq!(File::new("Makefile").mime_type(), "application/octet-stream");
    }

    #[test]
    fn test_safe_join() {
        let root = Path::new("out");
        assert_eq!(safe_join(root, "a/b.txt").unwrap(), PathBuf::from("out/a/b.txt"));
        assert_eq!(safe_join(root, "./c.txt").unwrap(), PathBuf::from("out/c.txt"));
        assert!(safe_join(root, "../escape").is_err());
        assert!(safe_join(root, "/etc/passwd").is_err());
        assert!(safe_join(root, "a\\..\\..\\b").is_err());
        assert!(safe_join(root, "").is_err());
    }

    #[tokio::test]
    async fn test_collect_folder() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub/.git")).unwrap();
        std::fs::write(dir.path().join("b.txt"), b"bbb").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("sub/c.bin"), b"").unwrap();
        std::fs::write(dir.path().join("sub/.git/HEAD"), b"ref").unwrap();
        std::fs::write(dir.path().join("old.vlock"), b"x").unwrap();

        let inputs = collect_folder(dir.path()).await.unwrap();
        let paths: Vec<&str> = inputs.iter().map(|i| i.relative_path.as_str()).collect();

        assert_eq!(paths, ["a.txt", "b.txt", "sub/c.bin"]);
        assert_eq!(inputs[1].bytes, b"bbb");
        assert_eq!(inputs[2].name, "c.bin");
    }

    #[tokio::test]
    async fn test_write_creates_parents() {
        let dir = tempdir().unwrap();
        let file = File::new(dir.path().join("x/y/z.bin"));
        file.write(b"data").await.unwrap();
        assert_eq!(file.read().await.unwrap(), b"data");
        assert!(file.validate(true, false).is_ok());
        assert!(file.validate(false, false).is_err());
        assert!(file.validate(false, true).is_ok());
    }
}
