use async_trait::async_trait;
use axum::http::Extensions;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::{StorageAdapter, StorageError, StorageFactory, StorageResult};
use crate::services::cache::CacheClient;
use crate::services::session::Session;

/// Session key holding the id that scopes this browser's cache entries.
pub const STORAGE_SCOPE_KEY: &str = "smartStorageScope";

/// Adapter that keeps SMART state in a cache instead of the session record.
///
/// The session only carries a random scope id, written on the first `set`; that
/// write is what gets the session stored and its cookie issued. The scope
/// survives session id rotation. Keys: `<prefix>:<scope>:<key>`.
#[derive(Clone)]
pub struct CacheStorage<C: CacheClient> {
    cache: Arc<C>,
    prefix: String,
    session: Session,
    ttl: Duration,
}

impl<C: CacheClient> CacheStorage<C> {
    pub fn new(cache: Arc<C>, prefix: impl Into<String>, session: Session, ttl: Duration) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            session,
            ttl,
        }
    }

    async fn scope(&self) -> StorageResult<Option<String>> {
        Ok(self.session.get::<String>(STORAGE_SCOPE_KEY).await?)
    }

    async fn scope_or_create(&self) -> StorageResult<String> {
        if let Some(scope) = self.scope().await? {
            return Ok(scope);
        }

        let scope = Uuid::new_v4().simple().to_string();
        self.session.insert(STORAGE_SCOPE_KEY, &scope).await?;
        Ok(scope)
    }

    fn key(&self, scope: &str, raw: &str) -> String {
        format!("{}:{}:{}", self.prefix, scope, raw)
    }
}

#[async_trait]
impl<C: CacheClient> StorageAdapter for CacheStorage<C> {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        let Some(scope) = self.scope().await? else {
            return Ok(None);
        };

        match self.cache.get_string(&self.key(&scope, key)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<Value> {
        let scope = self.scope_or_create().await?;
        let raw = serde_json::to_string(&value)?;
        self.cache
            .set_with_ttl(&self.key(&scope, key), &raw, self.ttl)
            .await?;
        Ok(value)
    }

    async fn unset(&self, key: &str) -> StorageResult<bool> {
        let Some(scope) = self.scope().await? else {
            return Ok(false);
        };

        Ok(self.cache.del(&self.key(&scope, key)).await? > 0)
    }
}

#[derive(Clone)]
pub struct CacheStorageFactory<C: CacheClient> {
    cache: Arc<C>,
    prefix: String,
    ttl: Duration,
}

impl<C: CacheClient> CacheStorageFactory<C> {
    pub fn new(cache: Arc<C>, prefix: impl Into<String>, ttl: Duration) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
            ttl,
        }
    }
}

impl<C: CacheClient> StorageFactory for CacheStorageFactory<C> {
    fn storage(&self, extensions: &Extensions) -> StorageResult<Arc<dyn StorageAdapter>> {
        let session = extensions
            .get::<Session>()
            .cloned()
            .ok_or(StorageError::MissingSession)?;

        Ok(Arc::new(CacheStorage::new(
            self.cache.clone(),
            self.prefix.clone(),
            session,
            self.ttl,
        )))
    }
}
