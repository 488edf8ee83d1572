use serde_json::Value;

use super::types::ClientState;
use crate::services::storage::{StorageAdapter, StorageResult};

/// Reserved storage key holding the indirection pointer.
pub const SMART_KEY: &str = "smartId";

/// Reserved storage key listing every state blob key this storage has written.
pub const SMART_KEYS: &str = "smartKeys";

/// Two-slot protocol over a [`StorageAdapter`]: `smartId` holds the key of the
/// current state blob, the blob lives under that key.
///
/// Only flow completion moves the pointer. A pointer whose blob is gone (or no
/// longer parses) resolves to "no client", never to an error.
///
/// Blob keys are also recorded under `smartKeys`, so [`clear`](Self::clear)
/// removes abandoned launches along with the current state.
pub struct ClientStateStore<'a> {
    storage: &'a dyn StorageAdapter,
}

impl<'a> ClientStateStore<'a> {
    pub fn new(storage: &'a dyn StorageAdapter) -> Self {
        Self { storage }
    }

    /// The current client state and the key it is stored under, if any.
    pub async fn resolve(&self) -> StorageResult<Option<(String, ClientState)>> {
        let Some(key) = self.pointer().await? else {
            return Ok(None);
        };

        let Some(state) = self.read(&key).await? else {
            tracing::debug!(state_key = %key, "{SMART_KEY} points at a missing state blob");
            return Ok(None);
        };

        Ok(Some((key, state)))
    }

    /// Store the state of a flow that has not completed yet. The pointer is untouched.
    pub async fn save_pending(&self, key: &str, state: &ClientState) -> StorageResult<()> {
        self.write(key, state).await?;
        self.track(key).await
    }

    pub async fn load_pending(&self, key: &str) -> StorageResult<Option<ClientState>> {
        self.read(key).await
    }

    /// Store the completed state, then point `smartId` at it.
    ///
    /// The blob is written first so the pointer never references a key that
    /// this call has not populated. The state it replaces (and its tokens) is
    /// removed once the pointer has moved.
    pub async fn complete(&self, key: &str, state: &ClientState) -> StorageResult<()> {
        self.write(key, state).await?;
        self.track(key).await?;

        let previous = self.pointer().await?;
        self.storage
            .set(SMART_KEY, Value::String(key.to_string()))
            .await?;

        if let Some(previous) = previous.filter(|previous| previous != key) {
            self.storage.unset(&previous).await?;
            self.untrack(&previous).await?;
        }
        Ok(())
    }

    /// Rewrite a blob in place (token refresh).
    pub async fn update(&self, key: &str, state: &ClientState) -> StorageResult<()> {
        self.write(key, state).await
    }

    /// Remove the pointer and every blob this storage has recorded, pending or
    /// completed. Returns whether anything was removed.
    pub async fn clear(&self) -> StorageResult<bool> {
        let mut keys = self.tracked().await?;
        if let Some(current) = self.pointer().await? {
            if !keys.contains(&current) {
                keys.push(current);
            }
        }

        let mut removed = false;
        for key in &keys {
            removed |= self.storage.unset(key).await?;
        }
        self.storage.unset(SMART_KEYS).await?;
        removed |= self.storage.unset(SMART_KEY).await?;

        Ok(removed)
    }

    async fn pointer(&self) -> StorageResult<Option<String>> {
        match self.storage.get(SMART_KEY).await? {
            Some(Value::String(key)) => Ok(Some(key)),
            Some(_) => {
                tracing::warn!("ignoring non-string {SMART_KEY} pointer");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn tracked(&self) -> StorageResult<Vec<String>> {
        let keys = match self.storage.get(SMART_KEYS).await? {
            Some(Value::Array(keys)) => keys
                .into_iter()
                .filter_map(|key| match key {
                    Value::String(key) => Some(key),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Ok(keys)
    }

    async fn track(&self, key: &str) -> StorageResult<()> {
        let mut keys = self.tracked().await?;
        if keys.iter().any(|k| k == key) {
            return Ok(());
        }
        keys.push(key.to_string());
        self.storage.set(SMART_KEYS, serde_json::to_value(keys)?).await?;
        Ok(())
    }

    async fn untrack(&self, key: &str) -> StorageResult<()> {
        let mut keys = self.tracked().await?;
        keys.retain(|k| k != key);
        self.storage.set(SMART_KEYS, serde_json::to_value(keys)?).await?;
        Ok(())
    }

    async fn read(&self, key: &str) -> StorageResult<Option<ClientState>> {
        let Some(raw) = self.storage.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_value(raw) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                tracing::warn!(state_key = %key, error = %err, "discarding unreadable client state");
                Ok(None)
            }
        }
    }

    async fn write(&self, key: &str, state: &ClientState) -> StorageResult<()> {
        debug_assert!(
            key != SMART_KEY && key != SMART_KEYS,
            "state blobs must not overwrite reserved keys"
        );
        self.storage.set(key, serde_json::to_value(state)?).await?;
        Ok(())
    }
}
