pub mod manifest;
pub mod covers;
pub mod audio;
pub mod converter;
pub mod metadata;
pub mod placer;
pub mod pipeline;

pub use audio::TrackFetcher;
pub use converter::FormatConverter;
pub use covers::CoverArtProcessor;
pub use manifest::ManifestClient;
pub use metadata::MetadataTagger;
pub use placer::OutputPlacer;
pub use pipeline::{AlbumArt, Pipeline, TrackJob, TrackSource};

use crate::config::{AudioFormat, TrackVariant};
use crate::publish::RemoteReference;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::path::PathBuf;

pub const INSTRUMENTAL_SUFFIX: &str = " (Instrumental)";

/// Album-level metadata shared by every track
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AlbumInfo {
    pub album_name: String,
    #[serde(default)]
    pub album_artist: Option<String>,
    pub artist_name: String,
    #[serde(default)]
    pub genre: String,
    #[serde(default, deserialize_with = "year_as_string")]
    pub year: String,
    #[serde(default)]
    pub cover_art_url: String,
    #[serde(default)]
    pub inst_cover_art_url: Option<String>,
}

/// One remix as listed in the manifest
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackMetadata {
    pub track_name: String,
    pub file_url: String,
    #[serde(default)]
    pub inst_url: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub track_number: Option<u32>,
    #[serde(default)]
    pub comments: Option<String>,
}

impl TrackMetadata {
    /// Title for the given variant. Instrumentals get the suffix exactly once.
    pub fn display_name(&self, variant: TrackVariant) -> Cow<'_, str> {
        match variant {
            TrackVariant::Original => Cow::Borrowed(&self.track_name),
            TrackVariant::Instrumental if self.track_name.ends_with(INSTRUMENTAL_SUFFIX) => {
                Cow::Borrowed(&self.track_name)
            }
            TrackVariant::Instrumental => {
                Cow::Owned(format!("{}{}", self.track_name, INSTRUMENTAL_SUFFIX))
            }
        }
    }

    /// Source URL for the variant, if the manifest has one
    pub fn source_url(&self, variant: TrackVariant) -> Option<&str> {
        let url = match variant {
            TrackVariant::Original => Some(self.file_url.as_str()),
            TrackVariant::Instrumental => self.inst_url.as_deref(),
        };
        url.filter(|u| !u.trim().is_empty())
    }

    /// Track number, or the 1-based position when the manifest omits it
    pub fn number_or(&self, position: usize) -> u32 {
        self.track_number.unwrap_or(position as u32)
    }

    /// File stem of the hosted original, used to match local masters to tracks
    pub fn url_stem(&self) -> Option<&str> {
        let path = self.file_url.split(['?', '#']).next()?;
        let name = path.rsplit('/').next()?;
        match name.rsplit_once('.') {
            Some((stem, _)) => Some(stem),
            None => Some(name),
        }
    }
}

/// The hosted track list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub metadata: AlbumInfo,
    #[serde(default)]
    pub tracks: Vec<TrackMetadata>,
}

impl Manifest {
    /// Look up a track by its exact name
    pub fn find_track(&self, name: &str) -> Option<&TrackMetadata> {
        self.tracks.iter().find(|t| t.track_name == name)
    }

    /// Match a local master by file stem against the hosted file names
    pub fn match_upload_name(&self, name: &str) -> Option<&TrackMetadata> {
        self.tracks.iter().find(|t| t.url_stem() == Some(name))
    }
}

/// Where finished files go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// `<base>/<album>/NN - name.ext`
    Local(PathBuf),
    /// `<root>/<[Instrumentals ]FORMAT>/NN - name.ext`
    AdminLibrary(PathBuf),
}

impl Destination {
    /// Folder that receives files for one format and variant
    pub fn folder_for(&self, album_name: &str, format: AudioFormat, variant: TrackVariant) -> PathBuf {
        match self {
            Destination::Local(base) => base.join(crate::utils::Utils::sanitize_album_name(album_name)),
            Destination::AdminLibrary(root) => {
                let sub = match variant {
                    TrackVariant::Original => format.to_string(),
                    TrackVariant::Instrumental => format!("Instrumentals {}", format),
                };
                root.join(sub)
            }
        }
    }
}

/// What a download run fetches and where it goes
#[derive(Debug, Clone)]
pub struct DownloadSelection {
    pub formats: Vec<AudioFormat>,
    pub variants: Vec<TrackVariant>,
    pub destination: Destination,
}

/// Normalized cover art, computed once per run
#[derive(Debug, Clone)]
pub struct CoverArt {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStage {
    Pending,
    Fetched,
    Converted,
    Tagged,
    Placed,
    Published,
    Failed,
}

impl std::fmt::Display for TrackStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackStage::Pending => write!(f, "Pending"),
            TrackStage::Fetched => write!(f, "Fetched"),
            TrackStage::Converted => write!(f, "Converted"),
            TrackStage::Tagged => write!(f, "Tagged"),
            TrackStage::Placed => write!(f, "Placed"),
            TrackStage::Published => write!(f, "Published"),
            TrackStage::Failed => write!(f, "Failed"),
        }
    }
}

/// Terminal state of one track
#[derive(Debug, Clone)]
pub struct TrackOutcome {
    pub name: String,
    pub stage: TrackStage,
    pub output_path: Option<PathBuf>,
    pub remote: Option<RemoteReference>,
    pub error: Option<String>,
}

impl TrackOutcome {
    pub fn success(&self) -> bool {
        self.stage != TrackStage::Failed
    }
}

/// End-of-run report
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: Vec<(String, String)>,
    /// Published locations, in run order
    pub published: Vec<RemoteReference>,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &TrackOutcome) {
        self.total += 1;
        if outcome.success() {
            self.succeeded += 1;
            if let Some(remote) = &outcome.remote {
                self.published.push(remote.clone());
            }
        } else {
            let reason = outcome.error.clone().unwrap_or_else(|| "unknown error".to_string());
            self.failed.push((outcome.name.clone(), reason));
        }
    }

    pub fn merge(&mut self, other: RunSummary) {
        self.total += other.total;
        self.succeeded += other.succeeded;
        self.failed.extend(other.failed);
        self.published.extend(other.published);
    }

    /// CDN paths to invalidate after the run
    pub fn purge_paths(&self) -> Vec<String> {
        self.published.iter().filter_map(|r| r.purge_path.clone()).collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} of {} tracks processed successfully", self.succeeded, self.total)?;
        if !self.failed.is_empty() {
            write!(f, "\nFailed:")?;
            for (name, reason) in &self.failed {
                write!(f, "\n  - {}: {}", name, reason)?;
            }
        }
        Ok(())
    }
}

/// The manifest stores the year as a number or a string
fn year_as_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Year {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Year>::deserialize(deserializer)? {
        Some(Year::Number(n)) => n.to_string(),
        Some(Year::Text(s)) => s,
        None => String::new(),
    })
}
