use thiserror::Error;

/// Main error type for the remix downloader
#[derive(Error, Debug)]
pub enum EvRemixesError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Lofty tagging error: {0}")]
    Lofty(#[from] lofty::error::LoftyError),

    #[error("Cover art error: {0}")]
    CoverArt(#[from] CoverArtError),

    #[error("Manifest error: {0}")]
    Manifest(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Conversion error: {0}")]
    Conversion(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Placement error: {0}")]
    Placement(String),

    #[error("Publish error: {0}")]
    Publish(String),

    #[error("CDN purge error: {0}")]
    Cdn(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing credential: {0} is not set")]
    MissingCredential(&'static str),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Cancelled")]
    Cancelled,
}

impl EvRemixesError {
    /// Errors that end the whole run before or instead of track processing
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EvRemixesError::Manifest(_)
                | EvRemixesError::CoverArt(_)
                | EvRemixesError::MissingCredential(_)
                | EvRemixesError::Config(_)
                | EvRemixesError::Cancelled
        )
    }

    /// Process exit code for an error that reached `main`
    pub fn exit_code(&self) -> i32 {
        match self {
            EvRemixesError::Cancelled => 130,
            _ => 1,
        }
    }
}

/// Cover art failures. Cover art is shared by every track, so these are fatal.
#[derive(Error, Debug)]
pub enum CoverArtError {
    #[error("album has no cover art URL")]
    MissingUrl,

    #[error("failed to download cover art: {0}")]
    Download(String),

    #[error("failed to decode cover art: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode cover art: {0}")]
    Encode(#[source] image::ImageError),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, EvRemixesError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_errors_are_fatal() {
        assert!(EvRemixesError::Manifest("offline".into()).is_fatal());
        assert!(EvRemixesError::CoverArt(CoverArtError::MissingUrl).is_fatal());
        assert!(EvRemixesError::MissingCredential("AZURE_STORAGE_SAS_URL").is_fatal());
    }

    #[test]
    fn test_track_errors_are_not_fatal() {
        assert!(!EvRemixesError::Download("404".into()).is_fatal());
        assert!(!EvRemixesError::Conversion("ffmpeg".into()).is_fatal());
        assert!(!EvRemixesError::Publish("timeout".into()).is_fatal());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(EvRemixesError::Cancelled.exit_code(), 130);
        assert_eq!(EvRemixesError::Manifest("bad json".into()).exit_code(), 1);
    }

    #[test]
    fn test_missing_credential_message_names_variable() {
        let err = EvRemixesError::MissingCredential("EV_TELEGRAM_BOT_TOKEN");
        assert_eq!(err.to_string(), "Missing credential: EV_TELEGRAM_BOT_TOKEN is not set");
    }
}
