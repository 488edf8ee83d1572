//! A FHIR API client rehydrated from persisted SMART state.
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::services::client_state::{ClientState, ClientStateStore};
use crate::services::oauth::{OAuthError, token};
use crate::services::storage::{StorageAdapter, StorageError};

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("unable to refresh: no refresh token was issued for this session")]
    NoRefreshToken,
    #[error("unable to refresh: {0}")]
    Token(#[from] OAuthError),
    #[error("unable to persist refreshed state: {0}")]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum FhirClientError {
    #[error("no access token available")]
    NotAuthorized,
    #[error("FHIR server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("FHIR request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Authenticated access to one FHIR server.
///
/// Built only from a state blob; refreshing writes the updated blob back under
/// the same key.
#[derive(Clone)]
pub struct FhirClient {
    http: reqwest::Client,
    key: String,
    state: ClientState,
    storage: Arc<dyn StorageAdapter>,
}

impl FhirClient {
    pub fn new(
        http: reqwest::Client,
        key: impl Into<String>,
        state: ClientState,
        storage: Arc<dyn StorageAdapter>,
    ) -> Self {
        Self {
            http,
            key: key.into(),
            state,
            storage,
        }
    }

    /// Storage key of the state blob.
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn server_url(&self) -> &str {
        &self.state.server_url
    }

    pub fn patient_id(&self) -> Option<&str> {
        self.state.patient()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.state.is_expired(now)
    }

    /// GET a path relative to the server base, e.g. `Patient/123`.
    pub async fn request(&self, path: &str) -> Result<Value, FhirClientError> {
        let access_token = self
            .state
            .access_token()
            .ok_or(FhirClientError::NotAuthorized)?;

        let url = format!(
            "{}/{}",
            self.state.server_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        let resp = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/fhir+json")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FhirClientError::Status { status, body });
        }

        Ok(resp.json().await?)
    }

    /// Use the refresh token to obtain a new access token and persist the result.
    pub async fn refresh(&mut self) -> Result<&ClientState, RefreshError> {
        let refresh_token = self
            .state
            .refresh_token()
            .ok_or(RefreshError::NoRefreshToken)?
            .to_string();

        let token = token::request_token(
            &self.http,
            &self.state,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ],
        )
        .await?;

        self.state.apply_token(token, Utc::now());

        ClientStateStore::new(self.storage.as_ref())
            .update(&self.key, &self.state)
            .await?;

        tracing::debug!(server = %self.state.server_url, expires_at = ?self.state.expires_at, "access token refreshed");

        Ok(&self.state)
    }
}

// Debug omits tokens.
impl fmt::Debug for FhirClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FhirClient")
            .field("key", &self.key)
            .field("server_url", &self.state.server_url)
            .field("patient", &self.state.patient())
            .field("expires_at", &self.state.expires_at)
            .finish_non_exhaustive()
    }
}
