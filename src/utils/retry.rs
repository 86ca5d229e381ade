// Retry utilities

use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Run `operation` until it succeeds or `max_retries` extra attempts have
/// failed. The delay doubles after every failure, capped at 32x `base_delay`.
pub async fn with_retry<F, T, E>(
    mut operation: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, E>
where
    F: FnMut() -> futures::future::BoxFuture<'static, Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if attempt >= max_retries {
                    return Err(error);
                }
                attempt += 1;

                let delay = base_delay * 2u32.pow((attempt - 1).min(5));
                warn!("Attempt {} failed: {}; retrying in {:?}", attempt, error, delay);
                sleep(delay).await;
            }
        }
    }
}
