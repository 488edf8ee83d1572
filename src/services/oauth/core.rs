//! The protocol boundary of the middleware.
//!
//! `OAuthCore` owns everything OAuth-specific: discovering endpoints, building
//! the authorization URL, exchanging the callback code. The middleware only
//! decides *when* to call it and turns the outcome into an HTTP response.
use async_trait::async_trait;
use axum::http::StatusCode;
use thiserror::Error;
use url::Url;

use crate::config::SmartOptions;
use crate::services::client_state::ClientState;
use crate::services::storage::{StorageAdapter, StorageError};

/// Launch parameters from the initiating request's query string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LaunchParams {
    pub launch: Option<String>,
    pub iss: Option<String>,
    pub fhir_service_url: Option<String>,
}

/// `code` + `state` from the authorization server's callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("no FHIR server url: expected an `iss` or `fhirServiceUrl` parameter or a configured server url")]
    MissingServerUrl,

    #[error("invalid FHIR server url {0}")]
    InvalidServerUrl(String),

    #[error("authorization server advertised an invalid endpoint {0}")]
    InvalidEndpoint(String),

    #[error("SMART discovery failed for {server}: {reason}")]
    Discovery { server: String, reason: String },

    #[error("no authorization state found for state {0}; the session may have expired")]
    StateNotFound(String),

    #[error("token request failed with status {status}: {body}")]
    TokenEndpoint { status: StatusCode, body: String },

    #[error("invalid token response: {0}")]
    InvalidTokenResponse(serde_json::Error),

    #[error("token response did not include an access token")]
    MissingAccessToken,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),

    // For `OAuthCore` implementations outside this crate.
    #[error("{message}")]
    Other {
        status: Option<StatusCode>,
        message: String,
    },
}

impl OAuthError {
    pub fn other(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        Self::Other {
            status,
            message: message.into(),
        }
    }

    /// HTTP status the middleware answers with; 500 unless the failure carries one.
    ///
    /// Bad launch or callback parameters are the caller's fault and answer 400.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingServerUrl | Self::InvalidServerUrl(_) | Self::StateNotFound(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::TokenEndpoint { status, .. } => *status,
            Self::Other {
                status: Some(status),
                ..
            } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[async_trait]
pub trait OAuthCore: Send + Sync {
    /// Persist the pending flow state through `storage` and return the
    /// authorization endpoint URL to redirect to.
    async fn authorize(
        &self,
        launch: &LaunchParams,
        options: &SmartOptions,
        storage: &dyn StorageAdapter,
    ) -> Result<Url, OAuthError>;

    /// Exchange the callback code for tokens, persist the completed state and
    /// move the `smartId` pointer to it.
    async fn complete_auth(
        &self,
        callback: &CallbackParams,
        storage: &dyn StorageAdapter,
    ) -> Result<ClientState, OAuthError>;
}
