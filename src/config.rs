use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::errors::{Result, EvRemixesError};

/// Lossless output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Flac,
    Alac,
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioFormat::Flac => write!(f, "FLAC"),
            AudioFormat::Alac => write!(f, "ALAC"),
        }
    }
}

impl std::str::FromStr for AudioFormat {
    type Err = EvRemixesError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "flac" => Ok(AudioFormat::Flac),
            "alac" | "m4a" => Ok(AudioFormat::Alac),
            _ => Err(EvRemixesError::InvalidFormat(s.to_string())),
        }
    }
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 2] = [AudioFormat::Alac, AudioFormat::Flac];

    /// File extension, which is also the extension hosted next to every track URL
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Flac => "flac",
            AudioFormat::Alac => "m4a",
        }
    }

    /// Human readable name used in progress output
    pub fn long_name(&self) -> &'static str {
        match self {
            AudioFormat::Flac => "FLAC",
            AudioFormat::Alac => "Apple Lossless",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            AudioFormat::Flac => "audio/flac",
            AudioFormat::Alac => "audio/mp4",
        }
    }

    /// Match a file extension (without dot) to a format
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "flac" => Some(AudioFormat::Flac),
            "m4a" => Some(AudioFormat::Alac),
            _ => None,
        }
    }
}

/// Format choice on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum FormatChoice {
    Flac,
    Alac,
    Both,
}

impl FormatChoice {
    pub fn formats(&self) -> Vec<AudioFormat> {
        match self {
            FormatChoice::Flac => vec![AudioFormat::Flac],
            FormatChoice::Alac => vec![AudioFormat::Alac],
            FormatChoice::Both => AudioFormat::ALL.to_vec(),
        }
    }
}

/// Original or instrumental rendition of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackVariant {
    Original,
    Instrumental,
}

impl TrackVariant {
    /// Disc number used to keep both renditions apart in one library view
    pub fn disc_number(&self) -> u32 {
        match self {
            TrackVariant::Original => 1,
            TrackVariant::Instrumental => 2,
        }
    }
}

impl std::fmt::Display for TrackVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackVariant::Original => write!(f, "Originals"),
            TrackVariant::Instrumental => write!(f, "Instrumentals"),
        }
    }
}

/// Variant choice on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum VariantChoice {
    Original,
    Instrumental,
    Both,
}

impl VariantChoice {
    pub fn variants(&self) -> Vec<TrackVariant> {
        match self {
            VariantChoice::Original => vec![TrackVariant::Original],
            VariantChoice::Instrumental => vec![TrackVariant::Instrumental],
            VariantChoice::Both => vec![TrackVariant::Original, TrackVariant::Instrumental],
        }
    }
}

/// Well-known download locations
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Location {
    Downloads,
    Music,
    Onedrive,
    Custom,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Downloads => write!(f, "Downloads folder"),
            Location::Music => write!(f, "Music folder"),
            Location::Onedrive => write!(f, "OneDrive folder"),
            Location::Custom => write!(f, "Custom path"),
        }
    }
}

/// Cover art configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    /// 1 to 100
    pub jpeg_quality: u8,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self { jpeg_quality: 95 }
    }
}

/// Blob storage layout
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    /// Folder inside the container that holds the tracks
    pub prefix: String,
    /// Public URL the container is served from (CDN endpoint)
    pub public_base_url: String,
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            prefix: "ev".to_string(),
            public_base_url: "https://files.dannystewart.com/music".to_string(),
        }
    }
}

/// CDN purge target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CdnConfig {
    pub enabled: bool,
    pub resource_group: String,
    pub profile_name: String,
    pub endpoint_name: String,
    /// Path purged when no explicit content paths are given
    pub default_content_path: String,
}

impl Default for CdnConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            resource_group: "dsfiles".to_string(),
            profile_name: "dsfiles".to_string(),
            endpoint_name: "dsfiles".to_string(),
            default_content_path: "/ev".to_string(),
        }
    }
}

/// Telegram channel publishing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub api_base_url: String,
    /// Upload cache location; the data directory is used when unset
    pub cache_path: Option<PathBuf>,
    pub cache_retention_days: i64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.telegram.org".to_string(),
            cache_path: None,
            cache_retention_days: 30,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub manifest_url: String,
    pub downloads_directory: PathBuf,
    pub music_directory: PathBuf,
    /// Admin library root; every format and variant lands in a subfolder here
    pub onedrive_directory: PathBuf,
    pub request_timeout_secs: u64,
    /// Show the output folder in the file manager after a download
    pub open_folder: bool,
    pub cover_config: CoverConfig,
    pub blob_config: BlobConfig,
    pub cdn_config: CdnConfig,
    pub telegram_config: TelegramConfig,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            manifest_url: "https://gitlab.dannystewart.com/danny/evremixes/raw/main/evtracks.json"
                .to_string(),
            downloads_directory: dirs::download_dir().unwrap_or_else(|| home.join("Downloads")),
            music_directory: dirs::audio_dir().unwrap_or_else(|| home.join("Music")),
            onedrive_directory: home
                .join("Library/CloudStorage/OneDrive-Personal")
                .join("Music/Danny Stewart/Evanescence Remixes"),
            request_timeout_secs: 30,
            open_folder: true,
            cover_config: CoverConfig::default(),
            blob_config: BlobConfig::default(),
            cdn_config: CdnConfig::default(),
            telegram_config: TelegramConfig::default(),
        }
    }
}

impl Config {
    /// Get the configuration directory path
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .ok_or_else(|| EvRemixesError::Config("Could not find config directory".to_string()))
            .map(|dir| dir.join("evremixes"))
    }

    /// Get the settings file path
    pub fn settings_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Directory for persisted state such as the upload cache
    pub fn data_dir() -> Result<PathBuf> {
        dirs::data_dir()
            .ok_or_else(|| EvRemixesError::Config("Could not find data directory".to_string()))
            .map(|dir| dir.join("evremixes"))
    }

    /// Load from the default location, writing defaults on first run
    pub fn load() -> Result<Self> {
        let settings_path = Self::settings_path()?;

        if !settings_path.exists() {
            let config = Self::default();
            config.save_to(&settings_path)?;
            return Ok(config);
        }

        Self::load_from(&settings_path)
    }

    /// Load configuration from an explicit TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EvRemixesError::Config(format!("Failed to read {}: {}", path.display(), e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| EvRemixesError::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would fail every run
    pub fn validate(&self) -> Result<()> {
        let quality = self.cover_config.jpeg_quality;
        if !(1..=100).contains(&quality) {
            return Err(EvRemixesError::Config(format!(
                "cover_config.jpeg_quality must be between 1 and 100, got {}",
                quality
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(EvRemixesError::Config("request_timeout_secs must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EvRemixesError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let toml_content = toml::to_string_pretty(self)
            .map_err(|e| EvRemixesError::Config(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, toml_content)
            .map_err(|e| EvRemixesError::Config(format!("Failed to write settings file: {}", e)))?;

        Ok(())
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    /// Upload cache path, falling back to the data directory
    pub fn upload_cache_path(&self) -> Result<PathBuf> {
        match &self.telegram_config.cache_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("upload_cache.json")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config_toml() {
        let toml_str = r#"
manifest_url = "https://example.com/tracks.json"
request_timeout_secs = 10

[cdn_config]
enabled = false
"#;

        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.manifest_url, "https://example.com/tracks.json");
        assert_eq!(cfg.request_timeout_secs, 10);
        assert!(!cfg.cdn_config.enabled);
        assert!(cfg.open_folder);
        // Untouched sections keep their defaults
        assert_eq!(cfg.cdn_config.resource_group, "dsfiles");
        assert_eq!(cfg.cover_config.jpeg_quality, 95);
        assert_eq!(cfg.blob_config.prefix, "ev");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.telegram_config.cache_retention_days = 7;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.telegram_config.cache_retention_days, 7);
        assert_eq!(loaded.manifest_url, config.manifest_url);
    }

    #[test]
    fn test_load_from_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "manifest_url = [").unwrap();

        match Config::load_from(&path) {
            Err(EvRemixesError::Config(msg)) => assert!(msg.contains("Failed to parse")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_unusable_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "[cover_config]\njpeg_quality = 0\n").unwrap();
        match Config::load_from(&path) {
            Err(EvRemixesError::Config(msg)) => assert!(msg.contains("jpeg_quality")),
            other => panic!("expected config error, got {:?}", other),
        }

        std::fs::write(&path, "request_timeout_secs = 0\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(EvRemixesError::Config(_))));

        // An old `size` key is ignored; covers are always 800 px
        std::fs::write(&path, "[cover_config]\nsize = 0\njpeg_quality = 90\n").unwrap();
        assert_eq!(Config::load_from(&path).unwrap().cover_config.jpeg_quality, 90);
    }

    #[test]
    fn test_format_extensions_and_parsing() {
        assert_eq!(AudioFormat::Flac.extension(), "flac");
        assert_eq!(AudioFormat::Alac.extension(), "m4a");
        assert_eq!("m4a".parse::<AudioFormat>().unwrap(), AudioFormat::Alac);
        assert_eq!(AudioFormat::from_extension("FLAC"), Some(AudioFormat::Flac));
        assert!("mp3".parse::<AudioFormat>().is_err());
    }

    #[test]
    fn test_variant_disc_numbers() {
        assert_eq!(TrackVariant::Original.disc_number(), 1);
        assert_eq!(TrackVariant::Instrumental.disc_number(), 2);
        assert_eq!(VariantChoice::Both.variants().len(), 2);
        assert_eq!(FormatChoice::Both.formats().len(), 2);
    }
}
