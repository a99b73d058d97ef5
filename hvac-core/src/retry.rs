//! Fixed-delay retry for fallible async operations.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Pause between two attempts
pub const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Run `op` until it succeeds, at most `max_retries + 1` times, waiting
/// [`RETRY_DELAY`] between attempts. The last error is returned.
pub async fn retry<T, E, F, Fut>(max_retries: u32, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    retry_with_delay(max_retries, RETRY_DELAY, op).await
}

/// Same as [`retry`] with a custom delay
pub async fn retry_with_delay<T, E, F, Fut>(
    max_retries: u32,
    delay: Duration,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_retries => {
                attempt += 1;
                debug!(attempt, max_retries, error = %e, "Attempt failed, retrying");
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
