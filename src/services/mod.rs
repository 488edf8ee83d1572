/*
 * Responsibility
 * - Collaborators of the SMART middleware: storage, sessions, OAuth protocol, FHIR client
 * - Nothing here knows about routes; HTTP wiring lives in middleware/ and api/
 */
pub mod cache;
pub mod client_state;
pub mod fhir_client;
pub mod oauth;
pub mod session;
pub mod storage;
