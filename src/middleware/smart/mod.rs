/*!
 * SMART authorization middleware
 *
 * Responsibility:
 * - Decide per request whether the OAuth flow starts, continues or is unrelated (`phase`)
 * - `authorize` / `complete_auth` / `refresh_auth`: axum middleware entry points
 * - `SmartAuth::get_client`: rehydrate a FhirClient from the request's storage
 *
 * Protocol work is delegated to `OAuthCore`; storage goes through the configured
 * `StorageFactory`.
 */

mod core;
mod phase;


pub use self::core::{SmartAuth, authorize, complete_auth, refresh_auth};
pub use phase::RequestPhase;
