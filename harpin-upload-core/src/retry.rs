//! Bounded retry with a fixed delay.
//!
//! [`with_retry`] is applied at each call site that talks to the network
//! during the upload itself. Which errors are worth another attempt is the
//! caller's choice via the `is_transient` predicate; anything else is
//! returned on the spot.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{error, warn};

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never zero.
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_ATTEMPTS,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Runs `call` until it succeeds, fails with a non-transient error, or
/// `policy.max_attempts` is used up. The last error is returned unchanged.
pub async fn with_retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    operation: &str,
    is_transient: P,
    mut call: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if is_transient(&e) && attempt < max_attempts => {
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    error = %e,
                    delay_secs = policy.delay.as_secs_f64(),
                    "Network error, retrying"
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                if is_transient(&e) {
                    error!(operation, attempts = attempt, error = %e, "Network error after all attempts");
                }
                return Err(e);
            }
        }
    }
}
