use crate::errors::{EvRemixesError, Result};
use futures_util::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const USER_AGENT: &str = concat!("evremixes/", env!("CARGO_PKG_VERSION"));

/// Network utilities around one shared client
#[derive(Clone)]
pub struct NetworkUtils {
    client: Client,
}

impl NetworkUtils {
    /// Create a new network utils instance with the default 30 second timeout
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new network utils instance with custom timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET a URL and return the body, failing on any non-2xx status
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// GET a URL and stream the body to `output_path`.
    /// A partial file is removed when the transfer fails.
    pub async fn download_file(&self, url: &str, output_path: &Path) -> Result<u64> {
        tracing::debug!("GET {} -> {}", url, output_path.display());
        let response = self.client.get(url).send().await?.error_for_status()?;

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let result = Self::stream_to_file(response, output_path).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(output_path).await;
        }
        result
    }

    async fn stream_to_file(response: reqwest::Response, output_path: &Path) -> Result<u64> {
        let mut file = tokio::fs::File::create(output_path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        if written == 0 {
            return Err(EvRemixesError::Download(format!(
                "empty response body for {}",
                output_path.display()
            )));
        }

        Ok(written)
    }
}

impl Default for NetworkUtils {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_download_file_streams_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/track.flac"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sub/track.flac");
        let net = NetworkUtils::new();

        let written = net
            .download_file(&format!("{}/track.flac", server.uri()), &out)
            .await
            .unwrap();

        assert_eq!(written, 4096);
        assert_eq!(std::fs::read(&out).unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let net = NetworkUtils::new();
        let result = net.get_bytes(&format!("{}/missing.json", server.uri())).await;
        assert!(matches!(result, Err(EvRemixesError::Network(_))));
    }
}
