use crate::config::Config;
use crate::errors::{EvRemixesError, Result};
use std::path::{Path, PathBuf};

pub const ADMIN_DOWNLOAD_VAR: &str = "EVREMIXES_ADMIN_DOWNLOAD";
pub const GET_INSTRUMENTALS_VAR: &str = "EVREMIXES_GET_INSTRUMENTALS";
pub const SAS_URL_VAR: &str = "AZURE_STORAGE_SAS_URL";
pub const TELEGRAM_TOKEN_VAR: &str = "EV_TELEGRAM_BOT_TOKEN";
pub const TELEGRAM_CHANNEL_VAR: &str = "EV_TELEGRAM_CHANNEL_ID";

/// Secrets and switches read from the environment
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub sas_url: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_channel_id: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            sas_url: non_empty_var(SAS_URL_VAR),
            telegram_bot_token: non_empty_var(TELEGRAM_TOKEN_VAR),
            telegram_channel_id: non_empty_var(TELEGRAM_CHANNEL_VAR),
        }
    }

    /// Container SAS URL for blob uploads
    pub fn require_sas_url(&self) -> Result<&str> {
        self.sas_url
            .as_deref()
            .ok_or(EvRemixesError::MissingCredential(SAS_URL_VAR))
    }

    /// Bot token and channel id, both needed to post
    pub fn require_telegram(&self) -> Result<(&str, &str)> {
        let token = self
            .telegram_bot_token
            .as_deref()
            .ok_or(EvRemixesError::MissingCredential(TELEGRAM_TOKEN_VAR))?;
        let channel = self
            .telegram_channel_id
            .as_deref()
            .ok_or(EvRemixesError::MissingCredential(TELEGRAM_CHANNEL_VAR))?;
        Ok((token, channel))
    }
}

/// Everything a command handler needs: persisted config plus environment
#[derive(Debug, Clone)]
pub struct Settings {
    config: Config,
    config_path: Option<PathBuf>,
    credentials: Credentials,
    admin_download: bool,
    get_instrumentals: bool,
}

impl Settings {
    /// Load `.env`, then the config file (explicit path or the default location)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        let config = match config_path {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        Ok(Self {
            config,
            config_path: config_path.map(Path::to_path_buf),
            credentials: Credentials::from_env(),
            admin_download: env_flag(ADMIN_DOWNLOAD_VAR),
            get_instrumentals: env_flag(GET_INSTRUMENTALS_VAR),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Path the config was read from
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Config::settings_path(),
        }
    }

    pub fn admin_download(&self) -> bool {
        self.admin_download
    }

    pub fn get_instrumentals(&self) -> bool {
        self.get_instrumentals
    }

    /// Overwrite the config file with defaults
    pub fn reset(&mut self) -> Result<()> {
        self.config = Config::default();
        self.config.save_to(&self.config_path()?)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Flags are enabled only by the value `1`
fn env_flag(name: &str) -> bool {
    parse_flag(std::env::var(name).ok().as_deref())
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(value.map(str::trim), Some("1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some(" 1 ")));
        assert!(!parse_flag(Some("0")));
        assert!(!parse_flag(Some("true")));
        assert!(!parse_flag(None));
    }

    #[test]
    fn test_missing_credentials_name_the_variable() {
        let creds = Credentials::default();
        match creds.require_sas_url() {
            Err(EvRemixesError::MissingCredential(name)) => assert_eq!(name, SAS_URL_VAR),
            other => panic!("unexpected result: {:?}", other),
        }

        let creds = Credentials {
            telegram_bot_token: Some("token".into()),
            ..Default::default()
        };
        match creds.require_telegram() {
            Err(EvRemixesError::MissingCredential(name)) => assert_eq!(name, TELEGRAM_CHANNEL_VAR),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_reset_writes_defaults_to_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "request_timeout_secs = 5\n").unwrap();

        let mut settings = Settings {
            config: Config::load_from(&path).unwrap(),
            config_path: Some(path.clone()),
            credentials: Credentials::default(),
            admin_download: false,
            get_instrumentals: false,
        };
        assert_eq!(settings.config().request_timeout_secs, 5);

        settings.reset().unwrap();
        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.request_timeout_secs, 30);
    }
}
