/*
 * Responsibility
 * - AppError: every way a SMART middleware path can end without calling `next`
 * - IntoResponse: HTTP status + plain-text body (the flow is browser-facing; no JSON envelope)
 */
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::fhir_client::{FhirClientError, RefreshError};
use crate::services::oauth::OAuthError;
use crate::services::storage::StorageError;

/// Body of the `refresh_auth` response when the session holds no authorization.
pub const LOST_SESSION_MESSAGE: &str = "Could not find an authorization state for this session. \
This usually means the server was restarted and the session was lost. \
Please launch the app again.";

#[derive(Debug, Error)]
pub enum AppError {
    // `error` / `error_description` on the authorization callback.
    #[error("{}", denied_message(.error, .description.as_deref()))]
    AuthorizationDenied {
        error: String,
        description: Option<String>,
    },

    #[error("{}", LOST_SESSION_MESSAGE)]
    LostSession,

    #[error("not authorized: launch the app first")]
    NotAuthorized,

    #[error(transparent)]
    OAuth(#[from] OAuthError),

    #[error(transparent)]
    Refresh(#[from] RefreshError),

    #[error(transparent)]
    Fhir(#[from] FhirClientError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    // Rotating the session id after a completed authorization.
    #[error("session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

fn denied_message(error: &str, description: Option<&str>) -> String {
    match description {
        Some(description) => format!("{error}: {description}"),
        None => error.to_string(),
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AuthorizationDenied { .. } => StatusCode::BAD_REQUEST,
            AppError::LostSession | AppError::NotAuthorized => StatusCode::UNAUTHORIZED,
            AppError::OAuth(e) => e.status(),
            AppError::Fhir(FhirClientError::Status { status, .. }) => *status,
            AppError::Fhir(_) => StatusCode::BAD_GATEWAY,
            AppError::Refresh(_)
            | AppError::Storage(_)
            | AppError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
