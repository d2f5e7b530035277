use crate::config::CdnConfig;
use crate::errors::{EvRemixesError, Result};
use std::path::PathBuf;

/// Invalidates CDN cached copies through the Azure CLI
pub struct CdnPurger {
    config: CdnConfig,
    az: PathBuf,
}

impl CdnPurger {
    pub fn new(config: CdnConfig) -> Self {
        Self::with_binary(config, "az")
    }

    pub fn with_binary(config: CdnConfig, az: impl Into<PathBuf>) -> Self {
        Self { config, az: az.into() }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    /// Arguments for `az`; falls back to the default content path when none are given
    pub fn build_args(&self, content_paths: &[String]) -> Vec<String> {
        let mut args: Vec<String> = [
            "cdn",
            "endpoint",
            "purge",
            "--resource-group",
            self.config.resource_group.as_str(),
            "--name",
            self.config.endpoint_name.as_str(),
            "--profile-name",
            self.config.profile_name.as_str(),
            "--content-paths",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        if content_paths.is_empty() {
            args.push(self.config.default_content_path.clone());
        } else {
            let mut paths = content_paths.to_vec();
            paths.sort();
            paths.dedup();
            args.extend(paths);
        }

        args
    }

    /// Run the purge. A disabled purger does nothing.
    pub async fn purge(&self, content_paths: &[String]) -> Result<()> {
        if !self.config.enabled {
            tracing::info!("CDN purge disabled in config");
            return Ok(());
        }

        let args = self.build_args(content_paths);
        tracing::info!("Purging CDN: {} {}", self.az.display(), args.join(" "));

        let output = tokio::process::Command::new(&self.az)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EvRemixesError::Cdn(format!("failed to run {}: {}", self.az.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EvRemixesError::Cdn(format!(
                "{} exited with {}: {}",
                self.az.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }
}
