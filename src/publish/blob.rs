use crate::config::{AudioFormat, BlobConfig};
use crate::errors::{EvRemixesError, Result};
use crate::publish::{PublishFuture, PublishRequest, Publisher, RemoteReference};
use reqwest::Client;
use std::path::Path;
use url::Url;

const STORAGE_API_VERSION: &str = "2023-11-03";
const UPLOAD_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(300);

/// Uploads to an Azure Blob container through a container SAS URL
pub struct BlobPublisher {
    client: Client,
    container_url: Url,
    prefix: String,
    public_base_url: String,
}

impl BlobPublisher {
    pub fn new(client: Client, sas_url: &str, config: &BlobConfig) -> Result<Self> {
        let container_url = Url::parse(sas_url.trim())
            .map_err(|e| EvRemixesError::Config(format!("invalid container SAS URL: {}", e)))?;

        Ok(Self {
            client,
            container_url,
            prefix: config.prefix.trim_matches('/').to_string(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `<prefix>/<name>.<ext>`
    pub fn blob_path(&self, blob_name: &str, format: AudioFormat) -> String {
        let file_name = format!("{}.{}", blob_name, format.extension());
        if self.prefix.is_empty() {
            file_name
        } else {
            format!("{}/{}", self.prefix, file_name)
        }
    }

    /// Put Blob target: container URL plus blob path, SAS query kept
    pub fn upload_url(&self, blob_path: &str) -> Result<Url> {
        let mut url = self.container_url.clone();
        url.path_segments_mut()
            .map_err(|_| EvRemixesError::Config("container SAS URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(blob_path.split('/'));
        Ok(url)
    }

    /// URL listeners use, served through the CDN
    pub fn public_url(&self, blob_path: &str) -> String {
        let encoded: Vec<String> = blob_path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.public_base_url, encoded.join("/"))
    }

    pub async fn upload(&self, local_path: &Path, request: &PublishRequest) -> Result<RemoteReference> {
        let blob_path = self.blob_path(&request.blob_name, request.format);
        let url = self.upload_url(&blob_path)?;
        let body = tokio::fs::read(local_path).await?;
        let content_type = request.format.content_type();

        tracing::info!("Uploading {} ({} bytes) to {}", local_path.display(), body.len(), blob_path);

        let mut builder = self
            .client
            .put(url)
            .timeout(UPLOAD_TIMEOUT)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", STORAGE_API_VERSION)
            .header("x-ms-client-request-id", uuid::Uuid::new_v4().to_string())
            .header("x-ms-access-tier", "Hot")
            .header("x-ms-blob-content-type", content_type)
            .header(reqwest::header::CONTENT_TYPE, content_type);

        // lets browsers play m4a instead of downloading it
        if request.format == AudioFormat::Alac {
            builder = builder.header("x-ms-blob-content-disposition", "inline");
        }

        let response = builder.body(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(EvRemixesError::Publish(format!(
                "blob upload of {} failed with {}: {}",
                blob_path,
                status,
                detail.trim()
            )));
        }

        Ok(RemoteReference {
            location: self.public_url(&blob_path),
            purge_path: Some(format!("/{}", blob_path)),
        })
    }
}

impl Publisher for BlobPublisher {
    fn name(&self) -> &'static str {
        "blob storage"
    }

    fn publish<'a>(&'a self, local_path: &'a Path, request: &'a PublishRequest) -> PublishFuture<'a> {
        Box::pin(self.upload(local_path, request))
    }
}
