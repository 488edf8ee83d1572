use async_trait::async_trait;
use tower_sessions::MemoryStore;
use tower_sessions::session::{Id, Record};
use tower_sessions::session_store::{self, SessionStore};

use super::cache::CacheSessionStore;
use crate::services::cache::ValkeyClient;

/// The session store chosen from configuration.
#[derive(Clone, Debug)]
pub enum SessionBackend {
    /// Process-local; sessions are lost on restart.
    Memory(MemoryStore),
    Valkey(CacheSessionStore<ValkeyClient>),
}

impl SessionBackend {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::default())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Valkey(_) => "valkey",
        }
    }
}

#[async_trait]
impl SessionStore for SessionBackend {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        match self {
            Self::Memory(store) => store.create(record).await,
            Self::Valkey(store) => store.create(record).await,
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        match self {
            Self::Memory(store) => store.save(record).await,
            Self::Valkey(store) => store.save(record).await,
        }
    }

    async fn load(&self, id: &Id) -> session_store::Result<Option<Record>> {
        match self {
            Self::Memory(store) => store.load(id).await,
            Self::Valkey(store) => store.load(id).await,
        }
    }

    async fn delete(&self, id: &Id) -> session_store::Result<()> {
        match self {
            Self::Memory(store) => store.delete(id).await,
            Self::Valkey(store) => store.delete(id).await,
        }
    }
}
