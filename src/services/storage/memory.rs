use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{StorageAdapter, StorageResult};

/// Plain in-process map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> StorageResult<Value> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.clone());
        Ok(value)
    }

    async fn unset(&self, key: &str) -> StorageResult<bool> {
        Ok(self.values.lock().await.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unset_reports_whether_a_value_existed() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.set("k", json!({"a": 1})).await.unwrap(), json!({"a": 1}));
        assert_eq!(storage.get("k").await.unwrap(), Some(json!({"a": 1})));
        assert!(storage.unset("k").await.unwrap());
        assert!(!storage.unset("k").await.unwrap());
        assert_eq!(storage.get("k").await.unwrap(), None);
    }
}
