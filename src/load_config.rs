/// `load_config` module: maps an optional YAML overrides file onto the core [`Settings`].
///
/// This is the only place user-supplied YAML is parsed. Every key is optional;
/// anything not given keeps the built-in default. Secrets never live here:
/// credentials come from the environment (see `harpin_upload_core::credentials`).
///
/// # Errors
/// Errors use `anyhow::Error` with context and surface at the CLI boundary as
/// a user error.
use anyhow::{bail, Result};
use harpin_upload_core::config::Settings;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettingsFile {
    pub api_base_url: Option<String>,
    pub source_system: Option<String>,
    pub max_concurrent_uploads: Option<usize>,
    pub max_file_size_bytes: Option<u64>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub poll_interval_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub storage_timeout_secs: Option<u64>,
}

impl SettingsFile {
    /// Applies the overrides on top of `base`.
    pub fn apply(self, base: Settings) -> Result<Settings> {
        let mut settings = base;
        if let Some(url) = self.api_base_url {
            if url.trim().is_empty() {
                bail!("api_base_url must not be empty");
            }
            settings.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(system) = self.source_system {
            settings.source_system = system;
        }
        if let Some(max) = self.max_concurrent_uploads {
            settings.max_concurrent_uploads = max;
        }
        if let Some(max) = self.max_file_size_bytes {
            settings.max_file_size = max;
        }
        if let Some(attempts) = self.retry_attempts {
            if attempts == 0 {
                bail!("retry_attempts must be at least 1");
            }
            settings.retry.max_attempts = attempts;
        }
        if let Some(secs) = self.retry_delay_secs {
            settings.retry.delay = Duration::from_secs(secs);
        }
        if let Some(secs) = self.poll_interval_secs {
            settings.poll_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = self.request_timeout_secs {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.storage_timeout_secs {
            settings.storage_timeout = Duration::from_secs(secs);
        }
        Ok(settings)
    }
}

/// Loads settings: defaults, overridden by the YAML file at `path` if one is given.
pub fn load_config<P: AsRef<Path>>(path: Option<P>) -> Result<Settings> {
    let Some(path) = path else {
        info!("No config file given, using built-in settings");
        return Ok(Settings::default());
    };
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    // An empty file is a valid "no overrides" file.
    let overrides: SettingsFile = if config_content.trim().is_empty() {
        SettingsFile::default()
    } else {
        match serde_yaml::from_str(&config_content) {
            Ok(conf) => {
                info!(config_path = ?path_ref, "Parsed config YAML successfully");
                conf
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
                return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
            }
        }
    };

    overrides.apply(Settings::default())
}
