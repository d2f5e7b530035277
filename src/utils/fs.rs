use crate::errors::Result;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use walkdir::WalkDir;

/// Extensions treated as previous download output
pub const AUDIO_EXTENSIONS: &[&str] = &["flac", "m4a", "alac", "wav", "aif", "aiff", "mp3", "ogg"];

/// File system utilities
pub struct FileUtils;

impl FileUtils {
    /// Create directory recursively
    pub fn create_directory(path: &Path) -> Result<()> {
        std::fs::create_dir_all(path)?;
        Ok(())
    }

    /// Move file, replacing any existing destination. Falls back to copy and
    /// remove when the rename crosses file systems.
    pub fn move_file(from: &Path, to: &Path) -> Result<()> {
        if let Some(parent) = to.parent() {
            Self::create_directory(parent)?;
        }

        if to.is_file() {
            std::fs::remove_file(to)?;
        }

        if let Err(e) = std::fs::rename(from, to) {
            tracing::debug!("rename {} failed ({}), copying instead", from.display(), e);
            std::fs::copy(from, to)?;
            std::fs::remove_file(from)?;
        }

        Ok(())
    }

    /// True when the file name looks like audio output from an earlier run,
    /// including partial `.m4a.temp` files left by an interrupted conversion
    pub fn is_stale_audio(path: &Path) -> bool {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_lowercase(),
            None => return false,
        };

        if name.ends_with(".m4a.temp") {
            return true;
        }

        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false)
    }

    /// Remove every stale audio file below `dir`, then prune subdirectories
    /// left empty. `dir` itself is kept. Returns the number of files removed.
    pub fn sweep_audio_files(dir: &Path) -> Result<usize> {
        let mut removed = 0;

        for entry in WalkDir::new(dir).min_depth(1).contents_first(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry under {}: {}", dir.display(), e);
                    continue;
                }
            };

            let path = entry.path();
            if entry.file_type().is_file() && Self::is_stale_audio(path) {
                std::fs::remove_file(path)?;
                removed += 1;
            } else if entry.file_type().is_dir() && Self::is_empty_dir(path) {
                // contents_first visits children before their parent
                std::fs::remove_dir(path)?;
            }
        }

        Ok(removed)
    }

    fn is_empty_dir(path: &Path) -> bool {
        std::fs::read_dir(path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false)
    }

    /// Sorted files directly inside `path`
    #[cfg(test)]
    pub fn list_files(path: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();

        for entry in std::fs::read_dir(path)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }

    /// Write bytes through a temp file in the same directory, then rename
    /// over the destination so readers never see a partial file
    pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        Self::create_directory(parent)?;

        let mut temp = tempfile::NamedTempFile::new_in(parent)?;
        temp.write_all(content)?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;

        Ok(())
    }

    /// Program that shows a folder on this desktop, if there is one
    pub fn file_manager_for(os: &str, has_display: bool) -> Option<&'static str> {
        match os {
            "windows" => Some("explorer"),
            "macos" => Some("open"),
            "linux" | "freebsd" | "openbsd" | "netbsd" if has_display => Some("xdg-open"),
            _ => None,
        }
    }

    /// Show `dir` in the desktop file manager. Headless sessions skip it.
    pub async fn open_in_file_manager(dir: &Path) -> Result<()> {
        let dir = std::fs::canonicalize(dir)?;
        let has_display = std::env::var_os("DISPLAY").is_some() || std::env::var_os("WAYLAND_DISPLAY").is_some();

        let program = match Self::file_manager_for(std::env::consts::OS, has_display) {
            Some(program) => program,
            None => {
                tracing::debug!("No file manager available for {}", dir.display());
                return Ok(());
            }
        };

        // explorer exits non-zero even when the window opens
        let status = tokio::process::Command::new(program)
            .arg(&dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await?;
        tracing::debug!("{} {} exited with {}", program, dir.display(), status);

        Ok(())
    }
}
