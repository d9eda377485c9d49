use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::capture::AudioBlob;
use crate::error::ExportError;

/// Reference to a materialized download on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadHandle {
    pub path: PathBuf,
}

/// Writes finalized audio blobs into a download directory.
///
/// Only one download is kept materialized at a time: exporting a new blob
/// removes the previously written file, so stale references never
/// accumulate.
pub struct AudioExporter {
    output_dir: PathBuf,
    last: Option<PathBuf>,
}

impl AudioExporter {
    pub fn new(output_dir: impl AsRef<Path>) -> Result<Self, ExportError> {
        let output_dir = output_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            output_dir,
            last: None,
        })
    }

    /// Write the blob, untransformed, as `<filename>.<ext>` with the
    /// extension taken from the blob's MIME type.
    pub fn export(&mut self, blob: &AudioBlob, filename: &str) -> Result<DownloadHandle, ExportError> {
        let path = self
            .output_dir
            .join(filename)
            .with_extension(extension_for(&blob.mime_type));

        std::fs::write(&path, &blob.data)?;

        info!("Audio download materialized: {}", path.display());

        // Release the previous download reference.
        if let Some(previous) = self.last.take() {
            if previous != path {
                if let Err(e) = std::fs::remove_file(&previous) {
                    warn!("Failed to remove previous download {}: {e}", previous.display());
                }
            }
        }

        self.last = Some(path.clone());

        Ok(DownloadHandle { path })
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/webm" => "webm",
        _ => "bin",
    }
}
