use crate::errors::{EvRemixesError, Result};
use crate::publish::{PublishFuture, PublishRequest, Publisher, RemoteReference, UploadCache};
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

/// Audio uploads outlive the default request timeout
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(100);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
}

/// Thin Bot API client for one channel
pub struct TelegramClient {
    client: Client,
    api_base: String,
    token: String,
    channel_id: String,
}

impl TelegramClient {
    pub fn new(client: Client, api_base: &str, token: &str, channel_id: &str) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            channel_id: channel_id.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Post an audio file silently; returns the new message id
    pub async fn send_audio(&self, path: &Path, request: &PublishRequest) -> Result<i64> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("track.m4a")
            .to_string();
        let contents = tokio::fs::read(path).await?;

        let audio = Part::bytes(contents)
            .file_name(file_name)
            .mime_str(request.format.content_type())?;

        let mut form = Form::new()
            .text("chat_id", self.channel_id.clone())
            .text("title", request.title.clone())
            .text("performer", request.performer.clone())
            .text("disable_notification", "true")
            .part("audio", audio);
        if let Some(duration) = request.duration_secs {
            form = form.text("duration", duration.to_string());
        }
        if let Some(caption) = request.caption.as_deref().filter(|c| !c.is_empty()) {
            form = form.text("caption", caption.to_string());
        }

        tracing::info!("Sending {} to Telegram", request.title);
        let response = self
            .client
            .post(self.method_url("sendAudio"))
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await?;

        let sent: SentMessage = Self::unwrap_response(response, "sendAudio").await?;
        Ok(sent.message_id)
    }

    pub async fn delete_message(&self, message_id: i64) -> Result<()> {
        let response = self
            .client
            .post(self.method_url("deleteMessage"))
            .json(&serde_json::json!({
                "chat_id": self.channel_id,
                "message_id": message_id,
            }))
            .send()
            .await?;

        let _: bool = Self::unwrap_response(response, "deleteMessage").await?;
        Ok(())
    }

    /// Bot API errors come back as `ok: false` with a description, usually with a 4xx status
    async fn unwrap_response<T: for<'de> Deserialize<'de>>(response: reqwest::Response, method: &str) -> Result<T> {
        let status = response.status();
        let body: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| EvRemixesError::Publish(format!("{} returned {} with unreadable body: {}", method, status, e)))?;

        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(EvRemixesError::Publish(format!(
                "{} failed ({}): {}",
                method,
                status,
                body.description.unwrap_or_else(|| "no description".to_string())
            ))),
        }
    }
}

/// Posts tracks to the channel and replaces the previous post of the same track
pub struct TelegramPublisher {
    client: TelegramClient,
    cache: Mutex<UploadCache>,
}

impl TelegramPublisher {
    pub fn new(client: TelegramClient, cache: UploadCache) -> Self {
        Self {
            client,
            cache: Mutex::new(cache),
        }
    }

    fn previous_posts(&self, track_name: &str) -> Vec<i64> {
        match self.cache.lock() {
            Ok(cache) => cache.message_ids(track_name),
            Err(poisoned) => poisoned.into_inner().message_ids(track_name),
        }
    }

    fn record_post(&self, track_name: &str, message_id: i64) {
        let mut cache = match self.cache.lock() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.replace(track_name, message_id, Utc::now());
        if let Err(e) = cache.save() {
            tracing::warn!("Failed to save upload cache {}: {}", cache.path().display(), e);
        }
    }

    pub async fn post(&self, local_path: &Path, request: &PublishRequest) -> Result<RemoteReference> {
        let previous = self.previous_posts(&request.track_name);
        let message_id = self.client.send_audio(local_path, request).await?;

        for old_id in previous.into_iter().filter(|id| *id != message_id) {
            match self.client.delete_message(old_id).await {
                Ok(()) => tracing::info!("Deleted previous post {} for {}", old_id, request.track_name),
                Err(e) => tracing::warn!("Could not delete previous post {}: {}", old_id, e),
            }
        }

        self.record_post(&request.track_name, message_id);

        Ok(RemoteReference {
            location: format!("message {}", message_id),
            purge_path: None,
        })
    }
}

impl Publisher for TelegramPublisher {
    fn name(&self) -> &'static str {
        "Telegram"
    }

    fn publish<'a>(&'a self, local_path: &'a Path, request: &'a PublishRequest) -> PublishFuture<'a> {
        Box::pin(self.post(local_path, request))
    }
}
