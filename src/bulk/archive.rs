use tokio::time::sleep;
use tracing::{debug, info};

use crate::bulk::manifest::{BulkManifest, FileEntry};
use crate::bulk::progress::{PauseSignal, Phase, ProgressSink, Tracker};
use crate::cipher::{self, Kdf};
use crate::config::{PAUSE_POLL_INTERVAL, PROGRESS_FILES_END, PROGRESS_MANIFEST_END};
use crate::error::{Error, Result};
use crate::header::{Argon2Params, encode_bulk};
use crate::processor::Processor;
use crate::secret::SecretBytes;

/// One file to be packed.
#[derive(Debug, Clone)]
pub struct BulkInput {
    /// Display name, usually the file name.
    pub name: String,
    /// Path relative to the archived folder, `/` separated.
    pub relative_path: String,
    pub bytes: Vec<u8>,
}

impl Processor {
    /// Packs `files` into one bulk archive.
    ///
    /// Files are sealed in input order, one at a time. Between files the
    /// `pause` signal is polled; while it reports paused the job sleeps and
    /// polls again. A file that has started is always finished first.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for an empty file list, plus any failure of the
    /// underlying key derivation or encryption.
    pub async fn encrypt_bulk<S, P>(&self, files: &[BulkInput], params: Argon2Params, progress: &mut S, pause: &P) -> Result<Vec<u8>>
    where
        S: ProgressSink + ?Sized,
        P: PauseSignal + ?Sized,
    {
        if files.is_empty() {
            return Err(Error::InvalidInput("no files to archive".to_owned()));
        }
        params.validate()?;

        let kdf = Kdf::Argon2id(params);
        let mut tracker = Tracker::new(progress, files.len());
        let mut blobs = Vec::with_capacity(files.len());
        let mut entries = Vec::with_capacity(files.len());
        let mut offset = 0u64;

        info!(files = files.len(), memory = params.memory, "encrypting bulk archive");

        for (index, file) in files.iter().enumerate() {
            while pause.is_paused() {
                sleep(PAUSE_POLL_INTERVAL).await;
            }

            tracker.step(Phase::EncryptingFiles, index, 0.0, PROGRESS_FILES_END, Some(&file.name));

            let blob = cipher::seal(self.password(), kdf, SecretBytes::new(&file.bytes)).await?;
            let length = blob.len() as u64;
            debug!(path = %file.relative_path, size = file.bytes.len(), length, offset, "sealed file");

            entries.push(FileEntry { id: FileEntry::id_for(index), path: file.relative_path.clone(), size: file.bytes.len() as u64, offset, length });
            offset += length;
            blobs.push(blob);

            tracker.step(Phase::EncryptingFiles, index + 1, 0.0, PROGRESS_FILES_END, Some(&file.name));
        }

        tracker.emit(Phase::EncryptingManifest, files.len(), PROGRESS_FILES_END, None);
        let manifest = BulkManifest::new(entries);
        let manifest_blob = cipher::seal(self.password(), kdf, SecretBytes::from_vec(manifest.to_json()?)).await?;

        tracker.emit(Phase::Packaging, files.len(), PROGRESS_MANIFEST_END, None);
        let archive = encode_bulk(&params, &manifest_blob, blobs.iter().map(Vec::as_slice))?;

        tracker.complete();
        info!(size = archive.len(), total_size = manifest.total_size, "bulk archive ready");

        Ok(archive)
    }
}
