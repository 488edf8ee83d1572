//! SMART-on-FHIR authorization session middleware for axum.
//!
//! The crate drives the OAuth2 authorization-code flow of a SMART app across
//! stateless HTTP requests:
//!
//! - [`middleware::smart::authorize`] starts a launch and redirects to the
//!   authorization server.
//! - [`middleware::smart::complete_auth`] consumes the callback, persists the
//!   resulting client state and redirects to the app.
//! - [`middleware::smart::refresh_auth`] forces a token refresh.
//! - [`middleware::smart::SmartAuth::get_client`] rehydrates a [`FhirClient`]
//!   from whatever the request's storage currently holds.
//!
//! Storage is pluggable through [`StorageAdapter`] / [`StorageFactory`]; the
//! default targets the cookie-backed [`Session`] installed by
//! [`middleware::session`].

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;

pub use config::SmartOptions;
pub use error::AppError;
pub use middleware::smart::{RequestPhase, SmartAuth};
pub use services::client_state::{ClientState, ClientStateStore, SMART_KEY};
pub use services::fhir_client::FhirClient;
pub use services::oauth::{OAuthCore, OAuthError, SmartOAuth};
pub use services::session::Session;
pub use services::storage::{StorageAdapter, StorageError, StorageFactory};
