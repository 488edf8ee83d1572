use async_trait::async_trait;
use axum::http::Extensions;
use serde_json::Value;
use std::sync::Arc;

use super::{StorageAdapter, StorageError, StorageFactory, StorageResult};
use crate::services::session::Session;

/// Default adapter: reads and writes the request's [`Session`] directly.
///
/// Writes become durable when the session layer persists the session,
/// which happens before the response leaves the server.
#[derive(Clone, Debug)]
pub struct SessionStorage {
    session: Session,
}

impl SessionStorage {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl StorageAdapter for SessionStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.session.get_value(key).await?)
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<Value> {
        self.session.insert(key, &value).await?;
        Ok(value)
    }

    async fn unset(&self, key: &str) -> StorageResult<bool> {
        Ok(self.session.remove_value(key).await?.is_some())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SessionStorageFactory;

impl StorageFactory for SessionStorageFactory {
    fn storage(&self, extensions: &Extensions) -> StorageResult<Arc<dyn StorageAdapter>> {
        let session = extensions
            .get::<Session>()
            .cloned()
            .ok_or(StorageError::MissingSession)?;

        Ok(Arc::new(SessionStorage::new(session)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tower_sessions::MemoryStore;

    #[test]
    fn factory_requires_a_session_extension() {
        let extensions = Extensions::new();
        assert!(matches!(
            SessionStorageFactory.storage(&extensions),
            Err(StorageError::MissingSession)
        ));
    }

    #[tokio::test]
    async fn writes_land_in_the_request_session() {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        let mut extensions = Extensions::new();
        extensions.insert(session.clone());

        let storage = SessionStorageFactory.storage(&extensions).unwrap();
        storage.set("smartId", json!("abc")).await.unwrap();

        assert_eq!(session.get_value("smartId").await.unwrap(), Some(json!("abc")));
        assert!(storage.unset("smartId").await.unwrap());
        assert!(!storage.unset("smartId").await.unwrap());
    }
}
