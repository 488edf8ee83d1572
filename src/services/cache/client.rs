//! Cache client interface used by the Valkey-backed session store and storage adapter.
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-layer errors (transport/command).
///
/// Kept independent from `AppError`; storage and session layers decide how a
/// backend failure is surfaced.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    BackendConnection(String),
    #[error("cache command error: {0}")]
    BackendCommand(String),
}

/// String keys, string values, per-key expiry.
///
/// Clones share the underlying connection or map.
#[async_trait]
pub trait CacheClient: Clone + Send + Sync + 'static {
    /// Short backend name for log lines.
    fn backend_name(&self) -> &'static str;

    async fn get_string(&self, key: &str) -> CacheResult<Option<String>>;

    /// Overwrites any existing value and resets its expiry.
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Number of keys removed (0 or 1).
    async fn del(&self, key: &str) -> CacheResult<u64>;
}
