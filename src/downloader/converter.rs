use crate::config::AudioFormat;
use crate::errors::{EvRemixesError, Result};
use std::path::{Path, PathBuf};

/// Lossless transcoding through an external `ffmpeg`
pub struct FormatConverter {
    ffmpeg: PathBuf,
}

impl FormatConverter {
    pub fn new() -> Self {
        Self::with_binary("ffmpeg")
    }

    pub fn with_binary(ffmpeg: impl Into<PathBuf>) -> Self {
        Self { ffmpeg: ffmpeg.into() }
    }

    /// Check if conversion is needed
    pub fn needs_conversion(input_path: &Path, format: AudioFormat) -> bool {
        let input_ext = input_path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();

        input_ext != format.extension()
    }

    /// Convert `source` into `work_dir`. When the source already has the target
    /// extension it is returned untouched.
    pub async fn convert(&self, source: &Path, format: AudioFormat, work_dir: &Path) -> Result<PathBuf> {
        if !Self::needs_conversion(source, format) {
            tracing::debug!("{} is already {}", source.display(), format);
            return Ok(source.to_path_buf());
        }

        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| EvRemixesError::Conversion(format!("bad source path: {}", source.display())))?;

        tokio::fs::create_dir_all(work_dir)
            .await
            .map_err(|e| EvRemixesError::Conversion(format!("Failed to create output directory: {}", e)))?;

        let output_path = work_dir.join(format!("{}.{}", stem, format.extension()));
        // ffmpeg writes to a temp name so an interrupted run never leaves a
        // file that looks finished
        let temp_path = work_dir.join(format!("{}.{}.temp", stem, format.extension()));

        tracing::info!("Converting {} to {}", source.display(), format.long_name());

        let mut cmd = tokio::process::Command::new(&self.ffmpeg);
        cmd.arg("-hide_banner")
            .arg("-loglevel").arg("error")
            .arg("-y")
            .arg("-i").arg(source)
            // drop embedded pictures; cover art is added by the tagger
            .arg("-vn");

        match format {
            AudioFormat::Flac => {
                cmd.arg("-c:a").arg("flac").arg("-f").arg("flac");
            }
            AudioFormat::Alac => {
                cmd.arg("-c:a").arg("alac").arg("-f").arg("ipod");
            }
        }
        cmd.arg(&temp_path);
        cmd.kill_on_drop(true);

        let output = cmd.output().await.map_err(|e| {
            EvRemixesError::Conversion(format!("Failed to execute {}: {}", self.ffmpeg.display(), e))
        })?;

        if !output.status.success() {
            let _ = tokio::fs::remove_file(&temp_path).await;
            let error_msg = String::from_utf8_lossy(&output.stderr);
            return Err(EvRemixesError::Conversion(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                error_msg.trim()
            )));
        }

        tokio::fs::rename(&temp_path, &output_path)
            .await
            .map_err(|e| EvRemixesError::Conversion(format!("Failed to finalize output: {}", e)))?;

        Ok(output_path)
    }

    /// First line of `ffmpeg -version`, or an error when it cannot run
    pub async fn version(&self) -> Result<String> {
        let output = tokio::process::Command::new(&self.ffmpeg)
            .arg("-version")
            .output()
            .await
            .map_err(|_| EvRemixesError::Conversion(format!("{} not found in PATH", self.ffmpeg.display())))?;

        if !output.status.success() {
            return Err(EvRemixesError::Conversion("ffmpeg version check failed".to_string()));
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string())
    }
}

impl Default for FormatConverter {
    fn default() -> Self {
        Self::new()
    }
}
