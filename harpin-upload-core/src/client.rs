//! `reqwest` implementation of [`IngestApi`] against the harpin AI REST API.
//!
//! Metadata calls go to [`Settings::api_base_url`] with the bearer token and a
//! JSON content type, bounded by [`Settings::request_timeout`]. The storage
//! transfer goes to the presigned URL with no Authorization header. It has no
//! total deadline; it fails once no bytes have moved for
//! [`Settings::storage_timeout`].

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Body, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

use crate::config::Settings;
use crate::contract::{
    AccessToken, CreatedUpload, Credentials, IngestApi, Source, TokenGrant, UploadRecord,
};
use crate::error::ApiError;
use crate::progress::{until_idle, IdleWatch, ProgressObserver, ProgressStream};

pub struct HarpinClient {
    http: Client,
    base_url: String,
    request_timeout: Duration,
    storage_timeout: Duration,
}

impl HarpinClient {
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let http = Client::builder()
            .user_agent(concat!("harpin-upload/", env!("CARGO_PKG_VERSION")))
            .build()?;
        info!(base_url = %settings.api_base_url, "Initialised harpin AI client");
        Ok(Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            request_timeout: settings.request_timeout,
            storage_timeout: settings.storage_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorised(&self, builder: RequestBuilder, token: &AccessToken) -> RequestBuilder {
        builder
            .bearer_auth(token.as_str())
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(self.request_timeout)
    }
}

/// Passes the response through when its status is in `accepted`, otherwise
/// turns it into [`ApiError::Status`] carrying the body for diagnostics.
async fn expect_status(response: Response, accepted: &[StatusCode]) -> Result<Response, ApiError> {
    let status = response.status();
    if accepted.contains(&status) {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        body,
    })
}

async fn json_body<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}

#[derive(Deserialize)]
struct SourcePage {
    #[serde(default)]
    content: Vec<Source>,
}

#[async_trait]
impl IngestApi for HarpinClient {
    async fn exchange_token(&self, credentials: &Credentials) -> Result<TokenGrant, ApiError> {
        debug!(client_id = %credentials.client_id, "Exchanging refresh token");
        let response = self
            .http
            .post(self.url("/token"))
            .json(&json!({
                "clientId": credentials.client_id,
                "refreshToken": credentials.refresh_token,
            }))
            .timeout(self.request_timeout)
            .send()
            .await?;
        let response = expect_status(response, &[StatusCode::OK]).await?;
        json_body(response).await
    }

    async fn get_source(
        &self,
        token: &AccessToken,
        source_id: &str,
    ) -> Result<Source, ApiError> {
        let request = self.http.get(self.url(&format!("/sources/{source_id}")));
        let response = self.authorised(request, token).send().await?;
        let response = expect_status(response, &[StatusCode::OK]).await?;
        json_body(response).await
    }

    async fn list_sources(&self, token: &AccessToken) -> Result<Vec<Source>, ApiError> {
        let request = self.http.get(self.url("/sources"));
        let response = self.authorised(request, token).send().await?;
        let response = expect_status(response, &[StatusCode::OK]).await?;
        let page: SourcePage = json_body(response).await?;
        Ok(page.content)
    }

    async fn list_uploads(
        &self,
        token: &AccessToken,
        source_id: &str,
    ) -> Result<serde_json::Value, ApiError> {
        let request = self
            .http
            .get(self.url(&format!("/sources/{source_id}/uploads")));
        let response = self.authorised(request, token).send().await?;
        let response = expect_status(response, &[StatusCode::OK]).await?;
        json_body(response).await
    }

    async fn create_upload(
        &self,
        token: &AccessToken,
        source_id: &str,
        file_name: &str,
    ) -> Result<CreatedUpload, ApiError> {
        let request = self
            .http
            .post(self.url(&format!("/sources/{source_id}/uploads")));
        let response = self
            .authorised(request, token)
            .json(&json!({ "fileName": file_name }))
            .send()
            .await?;
        let response =
            expect_status(response, &[StatusCode::OK, StatusCode::CREATED]).await?;
        json_body(response).await
    }

    async fn upload_to_storage(
        &self,
        presigned_url: &str,
        file_path: &Path,
        file_size: u64,
        observer: Arc<dyn ProgressObserver>,
    ) -> Result<(), ApiError> {
        let file = File::open(file_path).await.map_err(|e| {
            error!(error = ?e, path = ?file_path, "Failed to open file for transfer");
            ApiError::LocalFile(format!("failed to open {}: {e}", file_path.display()))
        })?;
        observer.begin(file_size);
        let watch = Arc::new(IdleWatch::new());
        let body = Body::wrap_stream(
            ProgressStream::new(ReaderStream::new(file), observer.clone()).watched(watch.clone()),
        );

        // Storage rejects chunked transfer; the length must be explicit.
        let request = self
            .http
            .put(presigned_url)
            .header(header::CONTENT_TYPE, "text/csv")
            .header(header::CONTENT_LENGTH, file_size)
            .body(body);
        let exchange = async {
            let response = request.send().await?;
            expect_status(response, &[StatusCode::OK]).await
        };
        // Only inactivity is bounded, never the total duration.
        let outcome = until_idle(exchange, &watch, self.storage_timeout).await;
        observer.finish();

        match outcome {
            Some(result) => result.map(|_| ()),
            None => {
                error!(
                    idle_secs = self.storage_timeout.as_secs_f64(),
                    "Storage transfer stalled"
                );
                Err(ApiError::Transport(format!(
                    "storage transfer stalled: no progress for {:.0} seconds",
                    self.storage_timeout.as_secs_f64()
                )))
            }
        }
    }

    async fn get_upload(
        &self,
        token: &AccessToken,
        source_id: &str,
        upload_id: &str,
    ) -> Result<UploadRecord, ApiError> {
        let request = self
            .http
            .get(self.url(&format!("/sources/{source_id}/uploads/{upload_id}")));
        let response = self.authorised(request, token).send().await?;
        let response = expect_status(response, &[StatusCode::OK]).await?;
        json_body(response).await
    }

    async fn request_import(
        &self,
        token: &AccessToken,
        source_id: &str,
        upload_id: &str,
    ) -> Result<(), ApiError> {
        let request = self.http.put(self.url(&format!(
            "/sources/{source_id}/uploads/{upload_id}/status"
        )));
        let response = self
            .authorised(request, token)
            .json(&json!({ "status": "importRequested" }))
            .send()
            .await?;
        expect_status(
            response,
            &[StatusCode::OK, StatusCode::ACCEPTED, StatusCode::NO_CONTENT],
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let settings = Settings {
            api_base_url: "https://api.example.test/".to_string(),
            ..Settings::default()
        };
        let client = HarpinClient::new(&settings).unwrap();
        assert_eq!(
            client.url("/sources/S1/uploads"),
            "https://api.example.test/sources/S1/uploads"
        );
    }

    #[tokio::test]
    async fn connection_failure_is_transient() {
        // Port 9 (discard) is not expected to be listening on loopback.
        let settings = Settings {
            api_base_url: "http://127.0.0.1:9".to_string(),
            request_timeout: Duration::from_secs(2),
            ..Settings::default()
        };
        let client = HarpinClient::new(&settings).unwrap();
        let err = client
            .exchange_token(&Credentials {
                client_id: "c".into(),
                refresh_token: "r".into(),
            })
            .await
            .unwrap_err();
        assert!(err.is_transient(), "expected transport error, got {err:?}");
    }
}
