use crate::downloader::{Manifest, TrackMetadata};
use crate::errors::{EvRemixesError, Result};
use crate::utils::net::NetworkUtils;

/// Fetches the hosted track list
pub struct ManifestClient<'a> {
    net: &'a NetworkUtils,
    url: String,
}

impl<'a> ManifestClient<'a> {
    pub fn new(net: &'a NetworkUtils, url: impl Into<String>) -> Self {
        Self { net, url: url.into() }
    }

    /// Download and parse the manifest, tracks sorted by track number.
    /// Every failure here is a `Manifest` error since nothing can run without it.
    pub async fn fetch(&self) -> Result<Manifest> {
        tracing::info!("Fetching track list from {}", self.url);

        let body = self
            .net
            .get_bytes(&self.url)
            .await
            .map_err(|e| EvRemixesError::Manifest(format!("failed to download track list: {}", e)))?;

        Self::parse(&body)
    }

    pub fn parse(body: &[u8]) -> Result<Manifest> {
        let mut manifest: Manifest = serde_json::from_slice(body)
            .map_err(|e| EvRemixesError::Manifest(format!("invalid track list: {}", e)))?;

        sort_by_track_number(&mut manifest.tracks);
        tracing::debug!("Track list has {} tracks", manifest.tracks.len());

        Ok(manifest)
    }
}

/// Stable ascending sort; a missing number sorts as 0
pub fn sort_by_track_number(tracks: &mut [TrackMetadata]) {
    tracks.sort_by_key(|t| t.track_number.unwrap_or(0));
}

/// Tracks ordered by start date, for publishing menus. Missing dates sort first
/// when ascending.
pub fn sorted_by_start_date(tracks: &[TrackMetadata], descending: bool) -> Vec<&TrackMetadata> {
    let mut sorted: Vec<&TrackMetadata> = tracks.iter().collect();
    sorted.sort_by(|a, b| a.start_date.cmp(&b.start_date));
    if descending {
        sorted.reverse();
    }
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MANIFEST: &str = r#"{
        "metadata": {
            "album_name": "Evanescence Remixes",
            "album_artist": "Danny Stewart",
            "artist_name": "Evanescence",
            "genre": "Electronic",
            "year": 2024,
            "cover_art_url": "https://example.com/cover.png"
        },
        "tracks": [
            {"track_name": "C", "file_url": "https://x/C.flac", "track_number": 3, "start_date": "2021-01-01"},
            {"track_name": "A", "file_url": "https://x/A.flac", "track_number": 1, "start_date": "2023-05-01"},
            {"track_name": "NoNumber", "file_url": "https://x/N.flac"},
            {"track_name": "B", "file_url": "https://x/B.flac", "track_number": 1, "start_date": "2022-03-01"}
        ]
    }"#;

    fn names(tracks: &[TrackMetadata]) -> Vec<&str> {
        tracks.iter().map(|t| t.track_name.as_str()).collect()
    }

    #[test]
    fn test_sort_is_stable_with_missing_as_zero() {
        let manifest = ManifestClient::parse(MANIFEST.as_bytes()).unwrap();
        // equal numbers keep manifest order, missing sorts as 0
        assert_eq!(names(&manifest.tracks), vec!["NoNumber", "A", "B", "C"]);
        assert_eq!(manifest.metadata.year, "2024");
    }

    #[test]
    fn test_sorted_by_start_date() {
        let manifest = ManifestClient::parse(MANIFEST.as_bytes()).unwrap();
        let newest_first: Vec<&str> = sorted_by_start_date(&manifest.tracks, true)
            .iter()
            .map(|t| t.track_name.as_str())
            .collect();
        assert_eq!(newest_first, vec!["A", "B", "C", "NoNumber"]);
    }

    #[test]
    fn test_invalid_json_is_manifest_error() {
        let result = ManifestClient::parse(b"{not json");
        assert!(matches!(result, Err(EvRemixesError::Manifest(_))));
    }

    #[tokio::test]
    async fn test_fetch_from_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/evtracks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string(MANIFEST))
            .mount(&server)
            .await;

        let net = NetworkUtils::new();
        let client = ManifestClient::new(&net, format!("{}/evtracks.json", server.uri()));
        let manifest = client.fetch().await.unwrap();
        assert_eq!(manifest.tracks.len(), 4);
    }

    #[tokio::test]
    async fn test_http_error_is_manifest_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let net = NetworkUtils::new();
        let client = ManifestClient::new(&net, format!("{}/evtracks.json", server.uri()));
        let err = client.fetch().await.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, EvRemixesError::Manifest(_)));
    }
}
