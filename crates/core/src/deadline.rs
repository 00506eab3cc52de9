use crate::error::DeadlineExceeded;
use std::future::Future;
use std::time::Duration;

/// Dropping `call` on expiry is the only cancellation point: in-flight
/// requests are aborted and `kill_on_drop` children are killed.
pub async fn with_deadline<T, E, F>(operation: &'static str, limit: Duration, call: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: From<DeadlineExceeded>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(DeadlineExceeded { operation, limit }.into()),
    }
}
