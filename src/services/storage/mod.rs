//! Per-request key/value persistence used by the SMART flow.
//!
//! [`StorageAdapter`] is the get/set/unset contract; [`StorageFactory`] resolves
//! the adapter for one request (the per-request storage hook of `SmartAuth`).
//! Keys `smartId`, `smartKeys` and the per-flow state keys are reserved by
//! [`crate::services::client_state`]; custom adapters must not collide with them.
use async_trait::async_trait;
use axum::http::Extensions;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::services::cache::CacheError;

pub mod cache;
pub mod memory;
pub mod session;

pub use cache::{CacheStorage, CacheStorageFactory};
pub use memory::MemoryStorage;
pub use session::{SessionStorage, SessionStorageFactory};

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no session on this request; is the session middleware installed?")]
    MissingSession,
    #[error("storage backend error: {0}")]
    Backend(#[from] CacheError),
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
    #[error("storage value error: {0}")]
    InvalidValue(#[from] serde_json::Error),
}

#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    // Returns the stored value.
    async fn set(&self, key: &str, value: Value) -> StorageResult<Value>;

    // `true` iff a value existed and was removed.
    async fn unset(&self, key: &str) -> StorageResult<bool>;
}

/// Resolves the storage adapter for a single request.
pub trait StorageFactory: Send + Sync {
    fn storage(&self, extensions: &Extensions) -> StorageResult<Arc<dyn StorageAdapter>>;
}

/// Hands every request the same adapter.
///
/// Only meaningful for single-user setups (CLIs, tests); every request shares
/// one authorization state.
#[derive(Clone)]
pub struct SharedStorageFactory {
    storage: Arc<dyn StorageAdapter>,
}

impl SharedStorageFactory {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }
}

impl StorageFactory for SharedStorageFactory {
    fn storage(&self, _extensions: &Extensions) -> StorageResult<Arc<dyn StorageAdapter>> {
        Ok(self.storage.clone())
    }
}
