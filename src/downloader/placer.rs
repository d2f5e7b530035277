use crate::errors::{EvRemixesError, Result};
use crate::utils::fs::FileUtils;
use crate::utils::Utils;
use std::path::{Path, PathBuf};

/// Decides final file names and moves finished files into place
pub struct OutputPlacer;

impl OutputPlacer {
    /// `NN - Track Name.ext`
    pub fn file_name(track_number: u32, track_name: &str, extension: &str) -> String {
        format!("{:02} - {}.{}", track_number, Utils::sanitize_filename(track_name), extension)
    }

    /// Final path for a track under `base_folder/<sanitized album>`
    pub fn place(album_name: &str, track_number: u32, track_name: &str, extension: &str, base_folder: &Path) -> PathBuf {
        base_folder
            .join(Utils::sanitize_album_name(album_name))
            .join(Self::file_name(track_number, track_name, extension))
    }

    /// Create `dir` and clear audio left by earlier runs
    pub fn prepare(dir: &Path) -> Result<()> {
        FileUtils::create_directory(dir)
            .map_err(|e| EvRemixesError::Placement(format!("cannot create {}: {}", dir.display(), e)))?;

        let removed = FileUtils::sweep_audio_files(dir)
            .map_err(|e| EvRemixesError::Placement(format!("cannot clean {}: {}", dir.display(), e)))?;
        if removed > 0 {
            tracing::info!("Removed {} previous downloads from {}", removed, dir.display());
        }

        Ok(())
    }

    /// Move a finished file to its destination, replacing an older copy
    pub fn write(source: &Path, destination: &Path) -> Result<()> {
        FileUtils::move_file(source, destination).map_err(|e| {
            EvRemixesError::Placement(format!(
                "cannot move {} to {}: {}",
                source.display(),
                destination.display(),
                e
            ))
        })
    }
}
