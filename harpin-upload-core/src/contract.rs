//! # contract: the network seam of the upload workflow
//!
//! [`IngestApi`] is the one trait every remote call goes through: the token
//! exchange, source and upload metadata calls against the API origin, and the
//! storage transfer to a presigned URL. The workflow modules only ever talk to
//! this trait, so the whole pipeline can be driven by `MockIngestApi` in tests.
//!
//! ## Status handling
//! Implementations translate HTTP into `Result`: a status in the operation's
//! accepted set becomes `Ok`, any other status becomes [`ApiError::Status`]
//! (with the response body), a broken JSON body becomes [`ApiError::Decode`],
//! and connection-level failures become [`ApiError::Transport`]. Deciding
//! whether a status is a user or system error is left to the caller.
//!
//! ## Mocking
//! The trait carries `automock` under `cfg(test)` or the `test-export-mocks`
//! feature, so dependents can build deterministic mocks too.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
#[allow(unused_imports)]
use mockall::{automock, predicate::*};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ApiError;
use crate::progress::ProgressObserver;

/// Client id and refresh token, both non-empty after trimming.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub refresh_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Bearer token for the lifetime of the process. Never persisted or renewed.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Body of a successful `/token` reply. The token field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub source_system: Option<String>,
}

/// Body of a successful create-upload reply. Either field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatedUpload {
    pub id: Option<String>,
    pub url: Option<String>,
}

/// Server-driven lifecycle of an upload record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum UploadStatus {
    Created,
    AnalysisInProgress,
    AnalysisCompleted,
    ImportRequested,
    ImportInProgress,
    ImportCompleted,
    Failed,
    /// A status this client does not know; polled through like any other.
    Other(String),
}

impl UploadStatus {
    /// Statuses that still hold one of the source's concurrency slots.
    /// `analysisCompleted` is included: the slot is only released after import.
    pub fn occupies_slot(&self) -> bool {
        matches!(
            self,
            UploadStatus::Created
                | UploadStatus::AnalysisInProgress
                | UploadStatus::AnalysisCompleted
                | UploadStatus::ImportRequested
                | UploadStatus::ImportInProgress
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            UploadStatus::Created => "created",
            UploadStatus::AnalysisInProgress => "analysisInProgress",
            UploadStatus::AnalysisCompleted => "analysisCompleted",
            UploadStatus::ImportRequested => "importRequested",
            UploadStatus::ImportInProgress => "importInProgress",
            UploadStatus::ImportCompleted => "importCompleted",
            UploadStatus::Failed => "failed",
            UploadStatus::Other(s) => s,
        }
    }
}

impl From<String> for UploadStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "created" => UploadStatus::Created,
            "analysisInProgress" => UploadStatus::AnalysisInProgress,
            "analysisCompleted" => UploadStatus::AnalysisCompleted,
            "importRequested" => UploadStatus::ImportRequested,
            "importInProgress" => UploadStatus::ImportInProgress,
            "importCompleted" => UploadStatus::ImportCompleted,
            "failed" => UploadStatus::Failed,
            _ => UploadStatus::Other(s),
        }
    }
}

impl From<&str> for UploadStatus {
    fn from(s: &str) -> Self {
        UploadStatus::from(s.to_string())
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of `GET /sources/{id}/uploads/{uploadId}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "unknown_status", deserialize_with = "status_or_unknown")]
    pub status: UploadStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub total_records: Option<u64>,
    #[serde(default)]
    pub imported_records: Option<u64>,
}

fn unknown_status() -> UploadStatus {
    UploadStatus::Other(String::new())
}

/// A null status is not yet at any target; keep polling through it.
fn status_or_unknown<'de, D>(deserializer: D) -> Result<UploadStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .map(UploadStatus::from)
        .unwrap_or_else(unknown_status))
}

impl UploadRecord {
    pub fn with_status(status: impl Into<UploadStatus>) -> Self {
        Self {
            id: None,
            status: status.into(),
            error_message: None,
            total_records: None,
            imported_records: None,
        }
    }
}

/// Remote operations of the harpin AI ingestion API.
///
/// Every authenticated call takes the bearer token explicitly; the trait
/// itself holds no session state.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait IngestApi: Send + Sync {
    /// `POST /token`. Only a 200 reply is `Ok`.
    async fn exchange_token(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError>;

    /// `GET /sources/{id}`.
    async fn get_source(&self, token: &AccessToken, source_id: &str)
        -> Result<Source, ApiError>;

    /// `GET /sources`, unwrapping the `content` array.
    async fn list_sources(&self, token: &AccessToken) -> Result<Vec<Source>, ApiError>;

    /// `GET /sources/{id}/uploads`. The body is returned as-is: servers answer
    /// with either a bare array or an object wrapping it under `content`.
    async fn list_uploads(
        &self,
        token: &AccessToken,
        source_id: &str,
    ) -> Result<serde_json::Value, ApiError>;

    /// `POST /sources/{id}/uploads` with the file name. 200 and 201 are `Ok`.
    async fn create_upload(
        &self,
        token: &AccessToken,
        source_id: &str,
        file_name: &str,
    ) -> Result<CreatedUpload, ApiError>;

    /// `PUT` of the whole file to the presigned URL with an explicit
    /// `Content-Length`. Only 200 is `Ok`.
    async fn upload_to_storage(
        &self,
        presigned_url: &str,
        file_path: &Path,
        file_size: u64,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<(), ApiError>;

    /// `GET /sources/{id}/uploads/{uploadId}`.
    async fn get_upload(
        &self,
        token: &AccessToken,
        source_id: &str,
        upload_id: &str,
    ) -> Result<UploadRecord, ApiError>;

    /// `PUT /sources/{id}/uploads/{uploadId}/status` with `importRequested`.
    /// 200, 202 and 204 are `Ok`.
    async fn request_import(
        &self,
        token: &AccessToken,
        source_id: &str,
        upload_id: &str,
    ) -> Result<(), ApiError>;
}
