use async_trait::async_trait;
use redis::{FromRedisValue, aio::ConnectionManager};
use std::time::Duration;

use crate::services::cache::client::{CacheClient, CacheError, CacheResult};

/// Valkey/Redis-backed cache client.
///
/// Sessions and the cache storage adapter only need GET, SET EX and DEL.
#[derive(Clone)]
pub struct ValkeyClient {
    manager: ConnectionManager,
}

impl ValkeyClient {
    /// Connect to `redis://host:port`; the manager reconnects on its own afterwards.
    pub async fn new(url: &str) -> Result<Self, CacheError> {
        let manager = redis::Client::open(url)
            .map_err(|e| CacheError::BackendConnection(e.to_string()))?
            .get_connection_manager()
            .await
            .map_err(|e| CacheError::BackendConnection(e.to_string()))?;

        Ok(Self { manager })
    }

    async fn run<T: FromRedisValue>(&self, cmd: &redis::Cmd) -> CacheResult<T> {
        let mut conn = self.manager.clone();
        cmd.query_async(&mut conn)
            .await
            .map_err(|e| CacheError::BackendCommand(e.to_string()))
    }
}

#[async_trait]
impl CacheClient for ValkeyClient {
    fn backend_name(&self) -> &'static str {
        "valkey"
    }

    async fn get_string(&self, key: &str) -> CacheResult<Option<String>> {
        self.run(redis::cmd("GET").arg(key)).await
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()> {
        // EX takes whole seconds, minimum 1.
        let seconds = ttl.as_secs().max(1);
        self.run(redis::cmd("SET").arg(key).arg(value).arg("EX").arg(seconds))
            .await
    }

    async fn del(&self, key: &str) -> CacheResult<u64> {
        self.run(redis::cmd("DEL").arg(key)).await
    }
}
