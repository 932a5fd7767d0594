//! Process-wide settings for one upload run.
//!
//! A [`Settings`] value is built once (defaults, optionally overridden by the
//! CLI's YAML file) and then only ever borrowed. Nothing in the core reads
//! globals.

use std::time::Duration;

use tracing::{debug, info};

use crate::retry::RetryPolicy;

pub const DEFAULT_API_BASE_URL: &str = "https://api.harpin.ai";
pub const FLAT_FILE_SOURCE_SYSTEM: &str = "flatFile";
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 3;
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024 * 1024;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Origin of every metadata call (`/token`, `/sources/...`). No trailing slash.
    pub api_base_url: String,
    /// Value `sourceSystem` must carry for a source to accept uploads.
    pub source_system: String,
    /// In-progress uploads at or above this count block a new one.
    pub max_concurrent_uploads: usize,
    pub max_file_size: u64,
    pub retry: RetryPolicy,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub storage_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            source_system: FLAT_FILE_SOURCE_SYSTEM.to_string(),
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
            max_file_size: DEFAULT_MAX_FILE_SIZE_BYTES,
            retry: RetryPolicy::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            storage_timeout: DEFAULT_STORAGE_TIMEOUT,
        }
    }
}

impl Settings {
    pub fn trace_loaded(&self) {
        info!(
            api_base_url = %self.api_base_url,
            max_concurrent_uploads = self.max_concurrent_uploads,
            max_file_size = self.max_file_size,
            "Loaded settings"
        );
        debug!(settings = ?self, "Settings loaded (full debug)");
    }
}
