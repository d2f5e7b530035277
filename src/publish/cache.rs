use crate::errors::Result;
use crate::utils::fs::FileUtils;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One channel post for a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedUpload {
    pub message_id: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Remembers which channel messages belong to which track, so a new upload
/// can replace the old post
#[derive(Debug)]
pub struct UploadCache {
    path: PathBuf,
    retention: Duration,
    entries: BTreeMap<String, Vec<CachedUpload>>,
}

impl UploadCache {
    /// Load and prune. A missing file is an empty cache; an unreadable one is
    /// logged and replaced on the next save.
    pub fn load(path: &Path, retention_days: i64) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring corrupt upload cache {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!("Cannot read upload cache {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        let mut cache = Self {
            path: path.to_path_buf(),
            retention: Duration::days(retention_days.max(0)),
            entries,
        };
        cache.prune(Utc::now());
        cache
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Drop entries older than the retention window, and tracks left empty
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.retention;
        for uploads in self.entries.values_mut() {
            uploads.retain(|u| u.uploaded_at >= cutoff);
        }
        self.entries.retain(|_, uploads| !uploads.is_empty());
    }

    pub fn message_ids(&self, track_name: &str) -> Vec<i64> {
        self.entries
            .get(track_name)
            .map(|uploads| uploads.iter().map(|u| u.message_id).collect())
            .unwrap_or_default()
    }

    /// Make `message_id` the only post recorded for the track
    pub fn replace(&mut self, track_name: &str, message_id: i64, now: DateTime<Utc>) {
        self.entries.insert(
            track_name.to_string(),
            vec![CachedUpload { message_id, uploaded_at: now }],
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write through a temp file and rename
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.entries)?;
        FileUtils::write_atomic(&self.path, &json)
    }
}
