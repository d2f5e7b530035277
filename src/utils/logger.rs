use crate::errors::Result;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Logger utility for the application
pub struct Logger;

impl Logger {
    /// Initialize the logger from a `-v` count. `RUST_LOG` wins when set.
    pub fn init_with_verbosity(verbosity: u8) -> Result<()> {
        Self::init_with_level(Self::level_for(verbosity))
    }

    /// Initialize the logger with specified level
    pub fn init_with_level(level: Level) -> Result<()> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(level.to_string()));

        // stderr keeps stdout free for spinners and URLs
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();

        Ok(())
    }

    pub fn level_for(verbosity: u8) -> Level {
        match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    }

    /// Log track stage start
    pub fn log_track_stage(track: &str, stage: &str) {
        debug!("[{}] {}", track, stage);
    }

    /// Log track completion
    pub fn log_track_complete(track: &str, path: &str) {
        info!("Track complete: {} -> {}", track, path);
    }

    /// Log track failure
    pub fn log_track_failed(track: &str, error: &str) {
        warn!("Track failed: {} - Error: {}", track, error);
    }

    /// Log configuration loaded
    pub fn log_config_loaded(path: &str) {
        info!("Configuration loaded from: {}", path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(Logger::level_for(0), Level::WARN);
        assert_eq!(Logger::level_for(1), Level::INFO);
        assert_eq!(Logger::level_for(2), Level::DEBUG);
        assert_eq!(Logger::level_for(9), Level::DEBUG);
    }
}
