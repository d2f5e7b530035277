use crate::config::{AudioFormat, TrackVariant};
use crate::downloader::TrackMetadata;
use crate::errors::{EvRemixesError, Result};
use crate::utils::net::NetworkUtils;
use std::path::{Path, PathBuf};
use url::Url;

/// Downloads one rendition of one track
pub struct TrackFetcher<'a> {
    net: &'a NetworkUtils,
}

impl<'a> TrackFetcher<'a> {
    pub fn new(net: &'a NetworkUtils) -> Self {
        Self { net }
    }

    /// Resolve the URL for a variant in the requested format
    pub fn resolve_url(track: &TrackMetadata, variant: TrackVariant, format: AudioFormat) -> Result<String> {
        let source = track.source_url(variant).ok_or_else(|| {
            EvRemixesError::Download(format!("no {} URL for {}", variant_label(variant), track.track_name))
        })?;

        rewrite_extension(source, format.extension())
    }

    /// Download into memory
    pub async fn fetch(&self, track: &TrackMetadata, variant: TrackVariant, format: AudioFormat) -> Result<Vec<u8>> {
        let url = Self::resolve_url(track, variant, format)?;
        self.net
            .get_bytes(&url)
            .await
            .map_err(|e| EvRemixesError::Download(format!("{}: {}", url, e)))
    }

    /// Stream to a file in `work_dir`, named after the URL's last segment
    pub async fn fetch_to(
        &self,
        track: &TrackMetadata,
        variant: TrackVariant,
        format: AudioFormat,
        work_dir: &Path,
    ) -> Result<PathBuf> {
        let url = Self::resolve_url(track, variant, format)?;
        let file_name = Url::parse(&url)
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut segments| segments.next_back().map(str::to_string))
            })
            .map(|segment| urlencoding::decode(&segment).map(|s| s.into_owned()).unwrap_or(segment))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("download.{}", format.extension()));

        let output_path = work_dir.join(crate::utils::Utils::sanitize_filename(&file_name));
        tracing::info!("Downloading {} from {}", track.track_name, url);

        let bytes = self
            .net
            .download_file(&url, &output_path)
            .await
            .map_err(|e| EvRemixesError::Download(format!("{}: {}", url, e)))?;
        tracing::debug!("Downloaded {} bytes to {}", bytes, output_path.display());

        Ok(output_path)
    }
}

fn variant_label(variant: TrackVariant) -> &'static str {
    match variant {
        TrackVariant::Original => "file",
        TrackVariant::Instrumental => "instrumental",
    }
}

/// Replace the extension of the last path segment; query and fragment are kept.
/// A segment without an extension gets one appended. The rest of the path is
/// left exactly as encoded.
pub fn rewrite_extension(source: &str, extension: &str) -> Result<String> {
    let mut url = Url::parse(source)?;
    if url.cannot_be_a_base() {
        return Err(EvRemixesError::Download(format!("URL cannot be a base: {}", source)));
    }

    let path = url.path().to_string();
    let (parent, last) = path.rsplit_once('/').unwrap_or(("", path.as_str()));
    if last.is_empty() {
        return Err(EvRemixesError::Download(format!("URL has no file name: {}", source)));
    }

    let stem = match last.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => last,
    };
    url.set_path(&format!("{}/{}.{}", parent, stem, extension));

    Ok(url.to_string())
}
