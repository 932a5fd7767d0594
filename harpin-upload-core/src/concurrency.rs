//! Advisory gate on in-flight uploads for a source.
//!
//! Checked once before creating an upload. Another process may slip in
//! between the check and the create; the server is the final judge.

use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::Settings;
use crate::contract::{AccessToken, IngestApi, UploadStatus};
use crate::error::UploadError;

/// Counts uploads still holding a concurrency slot.
///
/// Accepts a bare array or an object carrying the array under `content`.
/// Array entries that are not objects are skipped.
pub fn count_in_progress(body: &Value) -> Result<usize, UploadError> {
    let uploads = match body {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("content") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        other => return Err(UploadError::UploadListShape(json_type_name(other))),
    };

    let mut in_progress = 0;
    for upload in uploads {
        let Some(entry) = upload.as_object() else {
            warn!(kind = json_type_name(upload), "Skipping non-object upload item");
            continue;
        };
        let occupies = entry
            .get("status")
            .and_then(Value::as_str)
            .map(|s| UploadStatus::from(s).occupies_slot())
            .unwrap_or(false);
        if occupies {
            in_progress += 1;
        }
    }
    Ok(in_progress)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub async fn check_concurrent_uploads<A>(
    api: &A,
    token: &AccessToken,
    source_id: &str,
    settings: &Settings,
) -> Result<usize, UploadError>
where
    A: IngestApi + ?Sized,
{
    info!(source_id, "Checking concurrent uploads");
    let body = api.list_uploads(token, source_id).await.map_err(|e| {
        error!(source_id, error = %e, "Failed to check concurrent uploads");
        UploadError::UploadListRequest(e)
    })?;

    let in_progress = count_in_progress(&body)?;
    let limit = settings.max_concurrent_uploads;
    if in_progress >= limit {
        error!(in_progress, limit, "Maximum concurrent uploads reached");
        info!("Please wait for existing uploads to complete before starting a new one");
        return Err(UploadError::ConcurrencyLimit { in_progress, limit });
    }

    info!("Concurrent uploads check passed ({in_progress}/{limit})");
    Ok(in_progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_bare_array() {
        let body = json!([
            {"id": "a", "status": "importInProgress"},
            {"id": "b", "status": "importCompleted"},
            {"id": "c", "status": "analysisCompleted"},
            {"id": "d", "status": "failed"},
        ]);
        assert_eq!(count_in_progress(&body).unwrap(), 2);
    }

    #[test]
    fn counts_wrapped_page_and_skips_non_objects() {
        let body = json!({
            "content": [
                {"status": "created"},
                "garbage",
                42,
                {"status": "importRequested"},
                {"noStatus": true},
            ],
            "totalElements": 5
        });
        assert_eq!(count_in_progress(&body).unwrap(), 2);
    }

    #[test]
    fn object_without_content_counts_nothing() {
        assert_eq!(count_in_progress(&json!({"page": 0})).unwrap(), 0);
    }

    #[test]
    fn scalar_body_is_a_system_error() {
        let err = count_in_progress(&json!("nope")).unwrap_err();
        assert!(matches!(err, UploadError::UploadListShape("string")));
        assert_eq!(err.exit_code(), crate::error::EXIT_SYSTEM_ERROR);
    }
}
