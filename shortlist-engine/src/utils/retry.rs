//! Bounded retry with a fixed backoff
//!
//! Used for remote payload downloads, where every failure (transport error,
//! bad status, local write error) is worth another attempt.

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

/// Retry an async operation up to `max_attempts` times
///
/// **Algorithm:**
/// 1. Attempt operation
/// 2. If successful, return result
/// 3. On error: if attempts remain, log WARN, sleep `backoff`, retry
/// 4. After the last attempt, log and return the final error
///
/// `max_attempts` of 0 is treated as 1.
///
/// # Arguments
/// * `operation_name` - Name for logging (e.g., "audio fetch")
/// * `max_attempts` - Total number of attempts, first one included
/// * `backoff` - Delay between attempts
/// * `operation` - Closure producing one attempt; receives the 1-based attempt number
pub async fn retry_with_backoff<F, Fut, T, E>(
    operation_name: &str,
    max_attempts: u32,
    backoff: Duration,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = max_attempts.max(1);
    let start_time = Instant::now();
    let mut attempt = 0;

    loop {
        attempt += 1;

        if attempt > 1 {
            tracing::debug!(operation = operation_name, attempt, "Retrying operation");
        }

        match operation(attempt).await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt,
                        elapsed_ms = start_time.elapsed().as_millis(),
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if attempt >= max_attempts => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    error = %err,
                    "Operation failed: attempts exhausted"
                );
                return Err(err);
            }
            Err(err) => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    backoff_ms = backoff.as_millis(),
                    error = %err,
                    "Operation failed, will retry after backoff"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
}
