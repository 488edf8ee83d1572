/*!
 * Session persistence for `tower-sessions`
 *
 * Responsibility:
 * - `CacheSessionStore`: session records in a `CacheClient` (Valkey in production)
 * - `SessionBackend`: the store picked at startup (memory or cache), behind one type
 *   so the session layer is built the same way either way
 */

mod backend;
mod cache;

pub use backend::SessionBackend;
pub use cache::CacheSessionStore;
pub use tower_sessions::Session;
