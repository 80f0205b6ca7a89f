use std::future::Future;
use tokio::time::{sleep, Duration, Instant};
use tracing::debug;

/// Calls `check` until it yields `Some`, waiting between attempts.
///
/// Delays grow along a Fibonacci sequence starting at `initial_delay` and
/// are capped at `max_delay`. Returns `Ok(None)` once `timeout` has passed
/// without a result; an `Err` from `check` ends polling immediately. A
/// timeout too large to represent as an `Instant` means "wait forever".
pub async fn poll_with_backoff<T, E, Fut, F>(
    mut check: F,
    initial_delay: Duration,
    max_delay: Duration,
    timeout: Duration,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let deadline = Instant::now().checked_add(timeout);
    let mut attempts = 0;
    let mut fib = (initial_delay, initial_delay);

    loop {
        attempts += 1;
        if let Some(value) = check().await? {
            return Ok(Some(value));
        }

        let mut delay = fib.0.min(max_delay);
        if let Some(deadline) = deadline {
            let now = Instant::now();
            if now >= deadline {
                debug!("Gave up after {attempts} attempts");
                return Ok(None);
            }
            delay = delay.min(deadline - now);
        }

        debug!("Not ready after attempt {attempts}, checking again in {delay:?}");
        sleep(delay).await;
        // Stop growing once capped so the sum cannot overflow.
        if fib.0 < max_delay {
            fib = (fib.1, fib.0.saturating_add(fib.1));
        }
    }
}
