use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::smart::SmartAuth;
use crate::services::fhir_client::FhirClient;

/// Handler-side access to the session's FHIR client.
///
/// Uses the client `refresh_auth` left in request extensions when there is
/// one, otherwise rehydrates it from storage. No authorization → 401.
pub struct SmartClient(pub FhirClient);

impl<S> FromRequestParts<S> for SmartClient
where
    Arc<SmartAuth>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(client) = parts.extensions.get::<FhirClient>() {
            return Ok(SmartClient(client.clone()));
        }

        let smart = Arc::<SmartAuth>::from_ref(state);
        smart
            .get_client(&parts.extensions)
            .await?
            .map(SmartClient)
            .ok_or(AppError::NotAuthorized)
    }
}
