//! High-level pipeline: authenticate → validate → gate → upload → analyse → import.
//!
//! This module drives one CSV file through the harpin AI ingestion workflow.
//! Every step must succeed before the next starts, and the first failure ends
//! the run with an [`UploadError`] the binary maps to an exit code.
//!
//! # Upload lifecycle
//! The server moves the upload record through
//! `created → analysisInProgress → analysisCompleted → importRequested →
//! importInProgress → importCompleted`, with `failed` reachable from any
//! non-terminal state. The client only ever requests `importRequested`; every
//! other transition is observed by polling.
//!
//! # Retries
//! [`create_upload`], [`upload_to_storage`], each status fetch inside
//! [`poll_status`] and [`request_import`] are wrapped in
//! [`with_retry`](crate::retry::with_retry). Only transport errors are
//! retried; HTTP statuses and malformed bodies fail at once.
//!
//! # Navigation
//! - Main entrypoint: [`run_upload`]
//! - Result: [`UploadReport`]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info};

use crate::concurrency::check_concurrent_uploads;
use crate::config::Settings;
use crate::contract::{AccessToken, Credentials, IngestApi, UploadRecord, UploadStatus};
use crate::credentials::authenticate;
use crate::error::{ApiError, UploadError};
use crate::progress::ProgressObserver;
use crate::retry::with_retry;
use crate::validate::{validate_file, validate_source, ValidatedFile};

/// An upload record the server created for this run, with its storage target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSlot {
    pub upload_id: String,
    pub presigned_url: String,
}

/// Outcome of a completed run, used for the summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub source_id: String,
    pub upload_id: String,
    pub file_name: String,
    pub file_size: u64,
    pub total_records: u64,
    pub imported_records: u64,
    pub duration: Duration,
}

fn api_failure(operation: &'static str) -> impl FnOnce(ApiError) -> UploadError {
    move |source| {
        error!(operation, error = %source, "Request failed");
        UploadError::Api { operation, source }
    }
}

pub async fn create_upload<A>(
    api: &A,
    token: &AccessToken,
    source_id: &str,
    file_name: &str,
    settings: &Settings,
) -> Result<UploadSlot, UploadError>
where
    A: IngestApi + ?Sized,
{
    info!(source_id, file_name, "Creating upload");
    let created = with_retry(&settings.retry, "create upload", ApiError::is_transient, move || {
        api.create_upload(token, source_id, file_name)
    })
    .await
    .map_err(api_failure("create upload"))?;

    match (created.id.filter(|s| !s.is_empty()), created.url.filter(|s| !s.is_empty())) {
        (Some(upload_id), Some(presigned_url)) => {
            info!(upload_id = %upload_id, "Upload created");
            Ok(UploadSlot {
                upload_id,
                presigned_url,
            })
        }
        _ => {
            error!("Create upload response missing required fields");
            Err(UploadError::MalformedResponse("create upload"))
        }
    }
}

pub async fn upload_to_storage<A>(
    api: &A,
    slot: &UploadSlot,
    file: &ValidatedFile,
    observer: Arc<dyn ProgressObserver>,
    settings: &Settings,
) -> Result<(), UploadError>
where
    A: IngestApi + ?Sized,
{
    info!(file_name = %file.file_name(), "Uploading file to storage");
    with_retry(&settings.retry, "storage upload", ApiError::is_transient, move || {
        api.upload_to_storage(&slot.presigned_url, &file.path, file.size, observer.clone())
    })
    .await
    .map_err(api_failure("storage upload"))?;
    info!("File uploaded to storage successfully");
    Ok(())
}

/// Polls the upload until it reaches `target` and returns that payload.
///
/// A `failed` status ends the wait with the server's own error message. There
/// is no overall deadline: analysis and import take as long as the data
/// needs, and only an external signal cancels the wait.
pub async fn poll_status<A>(
    api: &A,
    token: &AccessToken,
    source_id: &str,
    upload_id: &str,
    target: UploadStatus,
    phase: &str,
    settings: &Settings,
) -> Result<UploadRecord, UploadError>
where
    A: IngestApi + ?Sized,
{
    info!(phase, "Waiting for {phase}");
    let started = Instant::now();
    let mut last_status: Option<UploadStatus> = None;

    loop {
        let record = with_retry(&settings.retry, "poll status", ApiError::is_transient, move || {
            api.get_upload(token, source_id, upload_id)
        })
        .await
        .map_err(api_failure("poll status"))?;

        if last_status.as_ref() != Some(&record.status) {
            info!(upload_id, status = %record.status, "Status: {}", record.status);
            last_status = Some(record.status.clone());
        }

        if record.status == UploadStatus::Failed {
            let message = record
                .error_message
                .clone()
                .unwrap_or_else(|| "Unknown error".to_string());
            error!(phase, message = %message, "Upload failed");
            return Err(UploadError::PhaseFailed {
                phase: phase.to_string(),
                message,
            });
        }

        if record.status == target {
            let elapsed = started.elapsed();
            info!(
                phase,
                elapsed_secs = elapsed.as_secs_f64(),
                "{phase} completed in {:.1} seconds",
                elapsed.as_secs_f64()
            );
            return Ok(record);
        }

        tokio::time::sleep(settings.poll_interval).await;
    }
}

pub async fn request_import<A>(
    api: &A,
    token: &AccessToken,
    source_id: &str,
    upload_id: &str,
    settings: &Settings,
) -> Result<(), UploadError>
where
    A: IngestApi + ?Sized,
{
    info!(upload_id, "Requesting import");
    with_retry(&settings.retry, "request import", ApiError::is_transient, move || {
        api.request_import(token, source_id, upload_id)
    })
    .await
    .map_err(api_failure("request import"))?;
    info!(upload_id, "Import requested");
    Ok(())
}

/// Runs the whole workflow for one file. Exactly one upload record is
/// created per call; nothing is rolled back on failure.
pub async fn run_upload<A>(
    api: &A,
    settings: &Settings,
    credentials: &Credentials,
    source_id: &str,
    file_path: &Path,
    observer: Arc<dyn ProgressObserver>,
) -> Result<UploadReport, UploadError>
where
    A: IngestApi + ?Sized,
{
    let started = Instant::now();

    let token = authenticate(api, credentials).await?;
    let file = validate_file(file_path, settings).await?;
    validate_source(api, &token, source_id, settings).await?;
    check_concurrent_uploads(api, &token, source_id, settings).await?;

    let file_name = file.file_name();
    let slot = create_upload(api, &token, source_id, &file_name, settings).await?;
    upload_to_storage(api, &slot, &file, observer, settings).await?;

    poll_status(
        api,
        &token,
        source_id,
        &slot.upload_id,
        UploadStatus::AnalysisCompleted,
        "analysis",
        settings,
    )
    .await?;

    request_import(api, &token, source_id, &slot.upload_id, settings).await?;

    let final_record = poll_status(
        api,
        &token,
        source_id,
        &slot.upload_id,
        UploadStatus::ImportCompleted,
        "import",
        settings,
    )
    .await?;

    let report = UploadReport {
        source_id: source_id.to_string(),
        upload_id: slot.upload_id,
        file_name,
        file_size: file.size,
        total_records: final_record.total_records.unwrap_or(0),
        imported_records: final_record.imported_records.unwrap_or(0),
        duration: started.elapsed(),
    };
    info!(?report, "Upload complete");
    Ok(report)
}
