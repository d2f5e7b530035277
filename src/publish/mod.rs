pub mod blob;
pub mod cache;
pub mod cdn;
pub mod telegram;

pub use blob::BlobPublisher;
pub use cache::UploadCache;
pub use cdn::CdnPurger;
pub use telegram::{TelegramClient, TelegramPublisher};

use crate::config::AudioFormat;
use crate::errors::Result;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;

/// What to publish and how to label it remotely
#[derive(Debug, Clone)]
pub struct PublishRequest {
    /// Manifest track name, the upload cache key
    pub track_name: String,
    /// Display title, with the instrumental suffix when relevant
    pub title: String,
    pub performer: String,
    pub format: AudioFormat,
    /// Remote file stem, without extension
    pub blob_name: String,
    pub duration_secs: Option<u32>,
    pub caption: Option<String>,
}

/// Where a published file ended up
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteReference {
    /// Public URL or channel message reference
    pub location: String,
    /// CDN content path to invalidate, when the target sits behind one
    pub purge_path: Option<String>,
}

pub type PublishFuture<'a> = Pin<Box<dyn Future<Output = Result<RemoteReference>> + 'a>>;

/// A remote destination for finished tracks
pub trait Publisher {
    fn name(&self) -> &'static str;

    fn publish<'a>(&'a self, local_path: &'a Path, request: &'a PublishRequest) -> PublishFuture<'a>;
}
