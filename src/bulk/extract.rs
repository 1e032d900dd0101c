use tracing::{debug, info, warn};

use crate::bulk::manifest::{BulkManifest, FileEntry};
use crate::bulk::progress::{Phase, ProgressSink, Tracker};
use crate::cipher::{self, Kdf};
use crate::config::PROGRESS_COMPLETE;
use crate::error::{Error, Result};
use crate::header::{Argon2Params, decode_bulk};
use crate::legacy::settle;
use crate::processor::{Decrypted, Processor};

/// A bulk archive whose manifest has been decrypted.
#[derive(Debug, Clone)]
pub struct OpenedArchive {
    pub manifest: BulkManifest,
    pub params: Argon2Params,
    /// Absolute offset of the file region. Entry offsets are relative to it.
    pub data_offset: usize,
}

/// One decrypted archive member.
#[derive(Debug)]
pub struct ExtractedFile {
    pub id: String,
    /// Relative path as recorded in the manifest.
    pub path: String,
    pub bytes: Vec<u8>,
}

/// A file opened without knowing in advance whether it is one item or an archive.
#[derive(Debug)]
pub enum Opened {
    Item(Decrypted),
    Archive(OpenedArchive),
}

impl Processor {
    /// Opens an envelope that may be a single item or a bulk archive.
    ///
    /// The framing alone cannot tell them apart: a single item's random salt
    /// sits where an archive keeps its manifest length. When the framing
    /// parses as an archive the manifest is tried first, and if it does not
    /// open the file is decrypted as a single item. A file that opens neither
    /// way reports the manifest failure.
    pub async fn open_envelope(&self, envelope: &[u8]) -> Result<Opened> {
        if decode_bulk(envelope).is_err() {
            return self.decrypt(envelope).await.map(Opened::Item);
        }

        match self.decrypt_manifest(envelope).await {
            Ok(opened) => Ok(Opened::Archive(opened)),
            Err(manifest_err @ Error::InvalidManifest(_)) => match self.decrypt(envelope).await {
                Ok(decrypted) => {
                    debug!("archive framing was a single item salt");
                    Ok(Opened::Item(decrypted))
                }
                Err(Error::DecryptionFailed) => Err(manifest_err),
                Err(other) => Err(other),
            },
            Err(other) => Err(other),
        }
    }

    /// Decrypts and validates the manifest of a bulk archive. File data is not touched.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedEnvelope`] when the framing is inconsistent;
    /// [`Error::InvalidManifest`] when the manifest does not decrypt (wrong
    /// password included) or is not a valid folder manifest.
    pub async fn decrypt_manifest(&self, archive: &[u8]) -> Result<OpenedArchive> {
        let layout = decode_bulk(archive)?;
        let region_len = (archive.len() - layout.data_offset) as u64;

        let json = cipher::open(self.password(), Kdf::Argon2id(layout.params), layout.manifest_blob).await.map_err(|e| match e {
            Error::MalformedEnvelope(reason) => Error::InvalidManifest(reason),
            other => {
                debug!(error = %other, "manifest did not open");
                Error::InvalidManifest("manifest did not decrypt".to_owned())
            }
        })?;

        let manifest = BulkManifest::from_json(&json, region_len)?;
        if manifest.total_files != manifest.files.len() {
            warn!(declared = manifest.total_files, actual = manifest.files.len(), "manifest file count mismatch");
        }

        info!(files = manifest.files.len(), total_size = manifest.total_size, "opened bulk manifest");
        Ok(OpenedArchive { manifest, params: layout.params, data_offset: layout.data_offset })
    }

    /// Decrypts one archive member using only its own blob.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedEnvelope`] when the entry points outside the archive,
    /// [`Error::DecryptionFailed`] when the blob does not authenticate.
    pub async fn decrypt_one_file(&self, archive: &[u8], entry: &FileEntry, params: Argon2Params, data_offset: usize) -> Result<Vec<u8>> {
        let start = usize::try_from(entry.offset).ok().and_then(|offset| offset.checked_add(data_offset));
        let end = usize::try_from(entry.length).ok().zip(start).and_then(|(length, start)| start.checked_add(length));

        let blob = start
            .zip(end)
            .and_then(|(start, end)| archive.get(start..end))
            .ok_or_else(|| Error::MalformedEnvelope(format!("{} points outside the archive", entry.id)))?;

        let bytes = cipher::open(self.password(), Kdf::Argon2id(params), blob).await.map_err(settle)?;
        if bytes.len() as u64 != entry.size {
            return Err(Error::InvalidManifest(format!("{} decrypted to {} bytes, manifest says {}", entry.id, bytes.len(), entry.size)));
        }

        debug!(id = %entry.id, path = %entry.path, size = bytes.len(), "decrypted archive member");
        Ok(bytes)
    }

    /// Decrypts every member in manifest order, reporting progress after each.
    pub async fn decrypt_all_files<S>(&self, archive: &[u8], opened: &OpenedArchive, progress: &mut S) -> Result<Vec<ExtractedFile>>
    where
        S: ProgressSink + ?Sized,
    {
        let files = &opened.manifest.files;
        let mut tracker = Tracker::new(progress, files.len());
        let mut extracted = Vec::with_capacity(files.len());

        for (index, entry) in files.iter().enumerate() {
            tracker.step(Phase::DecryptingFiles, index, 0.0, PROGRESS_COMPLETE, Some(&entry.path));
            let bytes = self.decrypt_one_file(archive, entry, opened.params, opened.data_offset).await?;
            extracted.push(ExtractedFile { id: entry.id.clone(), path: entry.path.clone(), bytes });
            tracker.step(Phase::DecryptingFiles, index + 1, 0.0, PROGRESS_COMPLETE, Some(&entry.path));
        }

        tracker.complete();
        Ok(extracted)
    }
}
