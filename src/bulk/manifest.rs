//! The encrypted file index of a bulk archive.
//!
//! ```json
//! {"version":"2.0","type":"BULK_FOLDER","totalFiles":2,"totalSize":510,"timestamp":1718000000000,
//!  "files":[{"id":"file_001","path":"a/b.txt","size":10,"offset":0,"length":70}, ...]}
//! ```
//!
//! Offsets are relative to the start of the file region, not to the archive.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::config::{AES_NONCE_SIZE, AES_TAG_SIZE, ARGON_SALT_LEN, BULK_MANIFEST_TYPE, BULK_MANIFEST_VERSION};
use crate::error::{Error, Result};

/// Smallest sealed file blob: salt, IV and the tag of an empty ciphertext.
pub const MIN_FILE_BLOB: u64 = (ARGON_SALT_LEN + AES_NONCE_SIZE + AES_TAG_SIZE) as u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkManifest {
    pub version: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub total_files: usize,
    pub total_size: u64,
    /// Creation time, milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub files: Vec<FileEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// `file_001`, `file_002`, ... in insertion order.
    pub id: String,
    /// Relative path, `/` separated.
    pub path: String,
    /// Plaintext size in bytes.
    pub size: u64,
    /// Offset of the sealed blob within the file region.
    pub offset: u64,
    /// Length of the sealed blob, salt, IV and tag included.
    pub length: u64,
}

impl FileEntry {
    pub fn id_for(index: usize) -> String {
        format!("file_{:03}", index + 1)
    }

    /// End of the sealed blob within the file region.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }

    /// True when `path` is relative and never climbs out of the extraction root.
    pub fn has_safe_path(&self) -> bool {
        let path = self.path.as_str();
        if path.is_empty() || path.starts_with(['/', '\\']) || path.as_bytes().get(1) == Some(&b':') {
            return false;
        }

        path.split(['/', '\\']).all(|component| component != "..")
    }
}

impl BulkManifest {
    /// Builds a manifest stamped with the current time.
    pub fn new(files: Vec<FileEntry>) -> Self {
        let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as u64).unwrap_or_default();

        Self {
            version: BULK_MANIFEST_VERSION.to_owned(),
            kind: BULK_MANIFEST_TYPE.to_owned(),
            total_files: files.len(),
            total_size: files.iter().map(|f| f.size).sum(),
            timestamp,
            files,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| Error::Encryption(format!("manifest serialization: {e}")))
    }

    /// Parses and validates a decrypted manifest against the size of the file region.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidManifest`] when the JSON does not parse, the type is not
    /// `BULK_FOLDER`, an entry points outside the file region, entries overlap
    /// or are out of order, or a path is absolute or climbs with `..`.
    pub fn from_json(json: &[u8], region_len: u64) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(json).map_err(|e| Error::InvalidManifest(format!("parse: {e}")))?;
        manifest.validate(region_len)?;
        Ok(manifest)
    }

    fn validate(&self, region_len: u64) -> Result<()> {
        if self.kind != BULK_MANIFEST_TYPE {
            return Err(Error::InvalidManifest(format!("unexpected type {:?}", self.kind)));
        }

        let mut previous_end = 0u64;
        for entry in &self.files {
            let end = entry.end().ok_or_else(|| Error::InvalidManifest(format!("{} range overflows", entry.id)))?;

            if entry.offset < previous_end {
                return Err(Error::InvalidManifest(format!("{} overlaps the previous entry", entry.id)));
            }
            if entry.length < MIN_FILE_BLOB || end > region_len {
                return Err(Error::InvalidManifest(format!("{} range {}..{end} is outside the file region", entry.id, entry.offset)));
            }
            if !entry.has_safe_path() {
                return Err(Error::InvalidManifest(format!("{} has an unsafe path {:?}", entry.id, entry.path)));
            }

            previous_end = end;
        }

        Ok(())
    }

    /// Looks an entry up by id or by path.
    pub fn find(&self, key: &str) -> Option<&FileEntry> {
        self.files.iter().find(|entry| entry.id == key || entry.path == key)
    }

    /// Sum of every sealed blob length.
    pub fn encrypted_size(&self) -> u64 {
        self.files.iter().map(|f| f.length).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: usize, path: &str, offset: u64, length: u64) -> FileEntry {
        FileEntry { id: FileEntry::id_for(index), path: path.to_owned(), size: length - MIN_FILE_BLOB, offset, length }
    }

    #[test]
    fn test_json_field_names() {
        let manifest = BulkManifest::new(vec![entry(0, "a.txt", 0, 70)]);
        let json = String::from_utf8(manifest.to_json().unwrap()).unwrap();

        assert!(json.contains(r#""type":"BULK_FOLDER""#));
        assert!(json.contains(r#""totalFiles":1"#));
        assert!(json.contains(r#""totalSize":10"#));
        assert!(json.contains(r#""id":"file_001""#));
        assert!(json.contains(r#""version":"2.0""#));
    }

    #[test]
    fn test_roundtrip() {
        let manifest = BulkManifest::new(vec![entry(0, "a.txt", 0, 70), entry(1, "dir/b.bin", 70, 60)]);
        let parsed = BulkManifest::from_json(&manifest.to_json().unwrap(), 130).unwrap();
        assert_eq!(parsed, manifest);
        assert_eq!(parsed.encrypted_size(), 130);
    }

    #[test]
    fn test_rejects_wrong_type() {
        let mut manifest = BulkManifest::new(vec![]);
        manifest.kind = "SINGLE".to_owned();
        assert!(matches!(BulkManifest::from_json(&manifest.to_json().unwrap(), 0), Err(Error::InvalidManifest(_))));
    }

    #[test]
    fn test_rejects_missing_files() {
        let json = br#"{"version":"2.0","type":"BULK_FOLDER","totalFiles":0,"totalSize":0,"timestamp":0}"#;
        assert!(matches!(BulkManifest::from_json(json, 0), Err(Error::InvalidManifest(_))));
    }

    #[test]
    fn test_rejects_out_of_range() {
        let manifest = BulkManifest::new(vec![entry(0, "a.txt", 0, 70)]);
        assert!(matches!(BulkManifest::from_json(&manifest.to_json().unwrap(), 69), Err(Error::InvalidManifest(_))));
    }

    #[test]
    fn test_rejects_overlap() {
        let manifest = BulkManifest::new(vec![entry(0, "a", 0, 70), entry(1, "b", 60, 60)]);
        assert!(matches!(BulkManifest::from_json(&manifest.to_json().unwrap(), 500), Err(Error::InvalidManifest(_))));
    }

    #[test]
    fn test_rejects_unsafe_paths() {
        for path in ["/etc/passwd", "../up.txt", "a/../../b", "\\\\server\\share", "C:\\x", ""] {
            let manifest = BulkManifest::new(vec![entry(0, path, 0, 70)]);
            assert!(matches!(BulkManifest::from_json(&manifest.to_json().unwrap(), 70), Err(Error::InvalidManifest(_))), "{path}");
        }
    }

    #[test]
    fn test_find() {
        let manifest = BulkManifest::new(vec![entry(0, "a.txt", 0, 70), entry(1, "b.txt", 70, 70)]);
        assert_eq!(manifest.find("file_002").unwrap().path, "b.txt");
        assert_eq!(manifest.find("a.txt").unwrap().id, "file_001");
        assert!(manifest.find("c.txt").is_none());
    }
}
