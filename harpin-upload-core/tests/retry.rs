use std::cell::Cell;
use std::time::Duration;

use harpin_upload_core::error::ApiError;
use harpin_upload_core::retry::{with_retry, RetryPolicy};
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_succeeds_on_third_attempt_after_two_fixed_delays() {
    let policy = RetryPolicy::default();
    let calls = Cell::new(0);
    let started = Instant::now();

    let result: Result<&str, ApiError> =
        with_retry(&policy, "create upload", ApiError::is_transient, || {
            calls.set(calls.get() + 1);
            let attempt = calls.get();
            async move {
                if attempt < 3 {
                    Err(ApiError::Transport("connection refused".to_string()))
                } else {
                    Ok("U1")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "U1");
    assert_eq!(calls.get(), 3);
    let slept = started.elapsed();
    assert!(slept >= Duration::from_secs(20), "slept {slept:?}");
    assert!(slept < Duration::from_secs(21), "slept {slept:?}");
}

#[tokio::test(start_paused = true)]
async fn test_returns_original_transport_error_after_exhausting_attempts() {
    let policy = RetryPolicy {
        max_attempts: 3,
        delay: Duration::from_secs(10),
    };
    let calls = Cell::new(0);

    let result: Result<(), ApiError> =
        with_retry(&policy, "request import", ApiError::is_transient, || {
            calls.set(calls.get() + 1);
            let attempt = calls.get();
            async move { Err(ApiError::Transport(format!("timeout #{attempt}"))) }
        })
        .await;

    assert_eq!(calls.get(), 3);
    match result.unwrap_err() {
        ApiError::Transport(msg) => assert_eq!(msg, "timeout #3"),
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_http_status_errors_are_not_retried() {
    let calls = Cell::new(0);
    let started = Instant::now();

    let result: Result<(), ApiError> = with_retry(
        &RetryPolicy::default(),
        "storage upload",
        ApiError::is_transient,
        || {
            calls.set(calls.get() + 1);
            async {
                Err(ApiError::Status {
                    status: 503,
                    body: "Slow Down".to_string(),
                })
            }
        },
    )
    .await;

    assert_eq!(calls.get(), 1);
    assert_eq!(result.unwrap_err().status(), Some(503));
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_zero_attempts_still_calls_once() {
    let policy = RetryPolicy {
        max_attempts: 0,
        delay: Duration::from_secs(1),
    };
    let calls = Cell::new(0);

    let result: Result<u8, ApiError> = with_retry(&policy, "poll status", ApiError::is_transient, || {
        calls.set(calls.get() + 1);
        async { Ok(7) }
    })
    .await;

    assert_eq!(result.unwrap(), 7);
    assert_eq!(calls.get(), 1);
}
