use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};

use crate::services::cache::{CacheClient, CacheError, ValkeyClient};

/// Session store on top of a [`CacheClient`]; each record is one JSON document
/// under `<prefix>:<session id>`, expiring with the record.
#[derive(Clone)]
pub struct CacheSessionStore<C: CacheClient> {
    cache: Arc<C>,
    // Key prefix to avoid collisions with other users of the same Valkey instance
    prefix: String,
}

impl CacheSessionStore<ValkeyClient> {
    pub async fn connect(valkey_url: &str) -> Result<Self, CacheError> {
        let client = ValkeyClient::new(valkey_url).await?;
        tracing::info!(backend = client.backend_name(), "session store connected");
        Ok(Self::new_with_cache(Arc::new(client), "smart:session"))
    }
}

impl<C: CacheClient> CacheSessionStore<C> {
    pub fn new_with_cache(cache: Arc<C>, prefix: impl Into<String>) -> Self {
        Self {
            cache,
            prefix: prefix.into(),
        }
    }

    fn key(&self, id: &Id) -> String {
        format!("{}:{}", self.prefix, id)
    }
}

impl<C: CacheClient> fmt::Debug for CacheSessionStore<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheSessionStore")
            .field("backend", &self.cache.backend_name())
            .field("prefix", &self.prefix)
            .finish()
    }
}

fn backend(err: CacheError) -> session_store::Error {
    session_store::Error::Backend(err.to_string())
}

// Whole seconds left until `expiry`, at least one.
fn ttl_until(expiry: OffsetDateTime) -> Duration {
    let seconds = (expiry - OffsetDateTime::now_utc()).whole_seconds();
    Duration::from_secs(u64::try_from(seconds).unwrap_or(0).max(1))
}

#[async_trait]
impl<C: CacheClient> SessionStore for CacheSessionStore<C> {
    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let raw = serde_json::to_string(record)
            .map_err(|e| session_store::Error::Encode(e.to_string()))?;

        self.cache
            .set_with_ttl(&self.key(&record.id), &raw, ttl_until(record.expiry_date))
            .await
            .map_err(backend)
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        let Some(raw) = self.cache.get_string(&self.key(id)).await.map_err(backend)? else {
            return Ok(None);
        };

        let record: Record =
            serde_json::from_str(&raw).map_err(|e| session_store::Error::Decode(e.to_string()))?;

        Ok(Some(record))
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        self.cache.del(&self.key(id)).await.map_err(backend)?;
        Ok(())
    }
}
