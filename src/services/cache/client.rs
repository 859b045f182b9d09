//! String cache interface used by the cluster dedup set.
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-layer errors (transport/command).
///
/// Kept apart from `AppError`: the dedup caller decides how a backend failure
/// affects forwarding.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    BackendConnection(String),
    #[error("cache command error: {0}")]
    BackendCommand(String),
}

/// Implementations must be cheap to clone (typically `Arc<...>` inside).
#[async_trait]
pub trait CacheClient: Clone + Send + Sync + 'static {
    // Backend name for logs.
    fn backend_name(&self) -> &'static str;

    // Set value if the key does not exist, with TTL.
    //
    // Returns:
    // - `Ok(true)`  if the key was set (not seen before)
    // - `Ok(false)` if the key already exists
    async fn set_if_absent_with_ttl(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> CacheResult<bool>;
}
