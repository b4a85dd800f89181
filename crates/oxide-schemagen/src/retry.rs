//! Timeouts for external steps.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{GenerateError, Result};

/// Runs `step` under `limit`. A timeout or a transient error is retried
/// once; the second failure is returned.
///
/// # Errors
///
/// Returns [`GenerateError::Timeout`] when both attempts time out, or the
/// error of the last attempt.
pub async fn with_retry<T, F, Fut>(name: &str, limit: Duration, mut step: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retried = false;
    loop {
        let failure = match tokio::time::timeout(limit, step()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if e.is_transient() => e,
            Ok(Err(e)) => return Err(e),
            Err(_) => GenerateError::Timeout {
                step: name.to_string(),
                seconds: limit.as_secs(),
            },
        };
        if retried {
            return Err(failure);
        }
        warn!(step = %name, error = %failure, "step failed, retrying once");
        retried = true;
    }
}
