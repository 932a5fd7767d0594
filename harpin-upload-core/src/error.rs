//! Error taxonomy for the upload workflow.
//!
//! [`ApiError`] describes what went wrong on the wire and is the only error
//! the retry combinator looks at. [`UploadError`] is the terminal outcome of a
//! run; each variant is either a user error (exit 1) or a system error
//! (exit 2).

use std::path::PathBuf;

use thiserror::Error;

use crate::contract::Source;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_USER_ERROR: u8 = 1;
pub const EXIT_SYSTEM_ERROR: u8 = 2;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection refused, timeout, DNS failure, reset mid-body.
    #[error("network error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response body: {0}")]
    Decode(String),
    #[error("local file error: {0}")]
    LocalFile(String),
}

impl ApiError {
    /// Only transport failures are retried. Statuses are judged by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    User,
    System,
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    MissingCredentials(Vec<&'static str>),
    #[error("authentication failed with status {status}: {details}")]
    AuthRejected { status: u16, details: String },
    #[error("authentication response missing access token")]
    AuthMissingToken,
    #[error("authentication request failed: {0}")]
    AuthRequest(#[source] ApiError),

    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("path is not a file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("file is not readable: {}", .0.display())]
    FileNotReadable(PathBuf),
    #[error("file size ({size}) exceeds maximum allowed size ({limit})")]
    FileTooLarge { size: String, limit: String },

    #[error("invalid source ID: {source_id}")]
    SourceNotFound {
        source_id: String,
        /// Source system the eligible sources were filtered on.
        source_system: String,
        available: Vec<Source>,
    },
    #[error("invalid source type: sourceSystem is of type '{found}', must be of type '{expected}'")]
    WrongSourceSystem { found: String, expected: String },
    #[error("failed to validate source ID: {0}")]
    SourceRequest(#[source] ApiError),
    #[error("failed to validate source ID (status {0})")]
    SourceStatus(u16),

    #[error("maximum concurrent uploads ({limit}) reached: {in_progress} upload(s) in progress")]
    ConcurrencyLimit { in_progress: usize, limit: usize },
    #[error("failed to check concurrent uploads: {0}")]
    UploadListRequest(#[source] ApiError),
    #[error("unexpected response format from uploads API: expected list or object, got {0}")]
    UploadListShape(&'static str),

    #[error("{0} response missing required fields")]
    MalformedResponse(&'static str),
    #[error("{operation} failed: {source}")]
    Api {
        operation: &'static str,
        #[source]
        source: ApiError,
    },
    #[error("{phase} failed: {message}")]
    PhaseFailed { phase: String, message: String },
    #[error("failed to initialise HTTP client: {0}")]
    ClientInit(#[source] ApiError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl UploadError {
    pub fn class(&self) -> ErrorClass {
        use UploadError::*;
        match self {
            MissingCredentials(_)
            | AuthRejected { .. }
            | AuthMissingToken
            | AuthRequest(_)
            | FileNotFound(_)
            | NotAFile(_)
            | FileNotReadable(_)
            | FileTooLarge { .. }
            | SourceNotFound { .. }
            | WrongSourceSystem { .. }
            | SourceRequest(_)
            | ConcurrencyLimit { .. }
            | Config(_) => ErrorClass::User,
            SourceStatus(_)
            | UploadListRequest(_)
            | UploadListShape(_)
            | MalformedResponse(_)
            | Api { .. }
            | PhaseFailed { .. }
            | ClientInit(_) => ErrorClass::System,
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self.class() {
            ErrorClass::User => EXIT_USER_ERROR,
            ErrorClass::System => EXIT_SYSTEM_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_errors_are_transient() {
        assert!(ApiError::Transport("connection refused".into()).is_transient());
        assert!(!ApiError::Status {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(!ApiError::Decode("eof".into()).is_transient());
    }

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(UploadError::AuthMissingToken.exit_code(), EXIT_USER_ERROR);
        assert_eq!(
            UploadError::ConcurrencyLimit {
                in_progress: 3,
                limit: 3
            }
            .exit_code(),
            EXIT_USER_ERROR
        );
        assert_eq!(UploadError::SourceStatus(500).exit_code(), EXIT_SYSTEM_ERROR);
        assert_eq!(
            UploadError::PhaseFailed {
                phase: "analysis".into(),
                message: "bad header".into()
            }
            .exit_code(),
            EXIT_SYSTEM_ERROR
        );
        assert_eq!(
            UploadError::ClientInit(ApiError::Transport("no TLS backend".into())).exit_code(),
            EXIT_SYSTEM_ERROR
        );
    }

    #[test]
    fn missing_credentials_lists_every_variable() {
        let err = UploadError::MissingCredentials(vec!["HARPIN_CLIENT_ID", "HARPIN_REFRESH_TOKEN"]);
        let msg = err.to_string();
        assert!(msg.contains("HARPIN_CLIENT_ID"));
        assert!(msg.contains("HARPIN_REFRESH_TOKEN"));
    }
}
