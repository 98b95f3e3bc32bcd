//! Generic retry helper for whole operations.

use std::future::Future;
use std::time::Duration;

use fetchkit_core::{Error, Result};

/// Run `operation` until it succeeds, at most `max_attempts` times.
///
/// The closure receives the attempt number, starting at 1. Failed attempts
/// are followed by a pause of `interval`; the last error is returned when
/// every attempt fails. `max_attempts` of 0 still makes one attempt.
///
/// ```no_run
/// use std::time::Duration;
/// use fetchkit::{Fetch, retry};
///
/// # async fn run(api: Fetch) -> fetchkit::Result<()> {
/// let body = retry(Duration::from_millis(200), 3, |_attempt| api.get("health").bytes()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry<T, F, Fut>(interval: Duration, max_attempts: u32, operation: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    retry_if(interval, max_attempts, |_| true, operation).await
}

/// Like [`retry`], but stops early when `should_retry` rejects an error.
pub async fn retry_if<T, F, Fut, P>(
    interval: Duration,
    max_attempts: u32,
    mut should_retry: P,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
    P: FnMut(&Error) -> bool,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < max_attempts && should_retry(&error) => {
                tracing::debug!(attempt, max_attempts, %error, "attempt failed, retrying");
                tokio::time::sleep(interval).await;
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
