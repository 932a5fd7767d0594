//! Credential resolution and token exchange.
//!
//! Both secrets come from the process environment. They are checked before
//! any network call, and the exchange itself is attempted exactly once: a
//! failure here is configuration feedback, not a transient condition.

use std::env;

use tracing::{error, info};

use crate::contract::{AccessToken, Credentials, IngestApi};
use crate::error::{ApiError, UploadError};

pub const CLIENT_ID_VAR: &str = "HARPIN_CLIENT_ID";
pub const REFRESH_TOKEN_VAR: &str = "HARPIN_REFRESH_TOKEN";

impl Credentials {
    /// Reads both secrets through `lookup`, trimming whitespace. Every
    /// missing or blank variable is named in the error.
    pub fn resolve<F>(lookup: F) -> Result<Self, UploadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let client_id = read(CLIENT_ID_VAR);
        let refresh_token = read(REFRESH_TOKEN_VAR);

        match (client_id, refresh_token) {
            (Some(client_id), Some(refresh_token)) => Ok(Credentials {
                client_id,
                refresh_token,
            }),
            (client_id, refresh_token) => {
                let mut missing = Vec::new();
                if client_id.is_none() {
                    missing.push(CLIENT_ID_VAR);
                }
                if refresh_token.is_none() {
                    missing.push(REFRESH_TOKEN_VAR);
                }
                error!(?missing, "Missing required environment variables");
                Err(UploadError::MissingCredentials(missing))
            }
        }
    }

    pub fn from_env() -> Result<Self, UploadError> {
        Self::resolve(|name| env::var(name).ok())
    }
}

/// Exchanges the refresh token for a bearer token. Not retried.
pub async fn authenticate<A>(api: &A, credentials: &Credentials) -> Result<AccessToken, UploadError>
where
    A: IngestApi + ?Sized,
{
    info!("Authenticating with harpin AI");
    match api.exchange_token(credentials).await {
        Ok(grant) => match grant.access_token.filter(|t| !t.is_empty()) {
            Some(token) => {
                info!("Authentication successful");
                Ok(AccessToken::new(token))
            }
            None => {
                error!("Authentication response missing access token");
                Err(UploadError::AuthMissingToken)
            }
        },
        Err(ApiError::Status { status, body }) => {
            error!(status, details = %body, "Authentication failed");
            Err(UploadError::AuthRejected {
                status,
                details: body,
            })
        }
        Err(e) => {
            error!(error = %e, "Authentication request failed");
            Err(UploadError::AuthRequest(e))
        }
    }
}
