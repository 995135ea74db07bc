// Fallback-wrapped external calls
// Every plagiarism and generation call goes through `with_fallback`

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CallFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Failed(String),
}

/// Run `fut` under `timeout`, folding both the timeout and the inner error into `CallFailure`.
pub async fn bounded<T, E, F>(timeout: Duration, fut: F) -> Result<T, CallFailure>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(CallFailure::Failed(e.to_string())),
        Err(_) => Err(CallFailure::Timeout(timeout)),
    }
}

/// Attempt the call; on timeout or error log a warning and return `default`.
/// Never propagates.
pub async fn with_fallback<T, E, F>(label: &str, timeout: Duration, fut: F, default: T) -> T
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match bounded(timeout, fut).await {
        Ok(value) => value,
        Err(failure) => {
            warn!("[FALLBACK] {} degraded: {}", label, failure);
            default
        }
    }
}
