/*!
 * SMART client state and its two-hop storage protocol
 *
 * Responsibility:
 * - `ClientState`: everything needed to rebuild a working FHIR client
 * - `ClientStateStore`: `smartId` pointer -> state blob resolution and writes
 */

mod core;
mod types;

pub use self::core::{ClientStateStore, SMART_KEY, SMART_KEYS};
pub use types::{ClientState, TokenResponse};
