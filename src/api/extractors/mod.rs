/*!
 * Request extractors
 *
 * Public API:
 * - SmartClient: the authorized FhirClient for this session
 */

mod smart_client;

pub use smart_client::SmartClient;
