//! Local file checks and remote source checks that gate the upload.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::contract::{AccessToken, IngestApi, Source};
use crate::error::{ApiError, UploadError};

/// A file that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFile {
    pub path: PathBuf,
    pub size: u64,
}

impl ValidatedFile {
    /// Base name sent as the upload record's `fileName`.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Human-readable size with 1024-based units, two decimals.
pub fn format_file_size(size_bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size_bytes as f64;
    for unit in UNITS {
        if size < 1024.0 {
            return format!("{size:.2} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.2} TB")
}

/// Checks existence, regular-file-ness, readability and size, in that order.
pub async fn validate_file(path: &Path, settings: &Settings) -> Result<ValidatedFile, UploadError> {
    info!(path = ?path, "Validating file");

    let metadata = match fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            error!(path = ?path, "File not found");
            return Err(UploadError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            error!(error = ?e, path = ?path, "File metadata unavailable");
            return Err(UploadError::FileNotReadable(path.to_path_buf()));
        }
    };

    if !metadata.is_file() {
        error!(path = ?path, "Path is not a file");
        return Err(UploadError::NotAFile(path.to_path_buf()));
    }

    if let Err(e) = fs::File::open(path).await {
        error!(error = ?e, path = ?path, "File is not readable");
        return Err(UploadError::FileNotReadable(path.to_path_buf()));
    }

    let size = metadata.len();
    if size > settings.max_file_size {
        let (size, limit) = (
            format_file_size(size),
            format_file_size(settings.max_file_size),
        );
        error!(%size, %limit, "File exceeds maximum allowed size");
        return Err(UploadError::FileTooLarge { size, limit });
    }

    let file = ValidatedFile {
        path: path.to_path_buf(),
        size,
    };
    info!(
        file_name = %file.file_name(),
        size = %format_file_size(size),
        "File validated"
    );
    Ok(file)
}

/// Confirms the source exists and accepts flat-file uploads.
///
/// On 404 the eligible sources are listed (best effort) so the caller can
/// correct the id; the result is still an error.
pub async fn validate_source<A>(
    api: &A,
    token: &AccessToken,
    source_id: &str,
    settings: &Settings,
) -> Result<(), UploadError>
where
    A: IngestApi + ?Sized,
{
    info!(source_id, "Validating source ID");
    match api.get_source(token, source_id).await {
        Ok(source) => {
            let found = source.source_system.as_deref().unwrap_or("unknown");
            if found != settings.source_system {
                error!(source_id, found, expected = %settings.source_system, "Invalid source type");
                return Err(UploadError::WrongSourceSystem {
                    found: found.to_string(),
                    expected: settings.source_system.clone(),
                });
            }
            info!(source_id, "Source ID validated");
            Ok(())
        }
        Err(ApiError::Status { status: 404, .. }) => {
            error!(source_id, "Invalid source ID");
            let available = eligible_sources(api, token, settings).await;
            Err(UploadError::SourceNotFound {
                source_id: source_id.to_string(),
                source_system: settings.source_system.clone(),
                available,
            })
        }
        Err(ApiError::Status { status, .. }) => {
            error!(source_id, status, "Failed to validate source ID");
            Err(UploadError::SourceStatus(status))
        }
        Err(e) => {
            error!(source_id, error = %e, "Failed to validate source ID");
            Err(UploadError::SourceRequest(e))
        }
    }
}

async fn eligible_sources<A>(api: &A, token: &AccessToken, settings: &Settings) -> Vec<Source>
where
    A: IngestApi + ?Sized,
{
    info!("Fetching available sources");
    let sources = match api.list_sources(token).await {
        Ok(sources) => sources,
        Err(e) => {
            warn!(error = %e, "Failed to retrieve available sources");
            return Vec::new();
        }
    };

    let eligible: Vec<Source> = sources
        .into_iter()
        .filter(|s| s.source_system.as_deref() == Some(settings.source_system.as_str()))
        .collect();
    info!(
        count = eligible.len(),
        source_system = %settings.source_system,
        "Found eligible sources"
    );
    eligible
}
