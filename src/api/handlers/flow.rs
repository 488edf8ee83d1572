/*
 * Responsibility
 * - Handlers behind the SMART middleware: reached only when the middleware calls `next`
 * - logout: drop the session's authorization
 */
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
};
use chrono::{TimeZone, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::api::extractors::SmartClient;
use crate::error::AppError;
use crate::middleware::smart::SmartAuth;

/// `/launch` without launch parameters (and no configured server).
pub async fn not_a_launch() -> (StatusCode, &'static str) {
    (
        StatusCode::BAD_REQUEST,
        "Missing launch parameters: expected `launch` and `iss`, or `fhirServiceUrl`.",
    )
}

/// `/callback` without `code`+`state` or `error`.
pub async fn not_a_callback() -> (StatusCode, &'static str) {
    (
        StatusCode::BAD_REQUEST,
        "Not an authorization callback: expected `code` and `state`.",
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedResponse {
    pub server_url: String,
    pub expires_at: Option<String>,
}

/// After `refresh_auth` succeeded.
pub async fn refreshed(SmartClient(client): SmartClient) -> Json<RefreshedResponse> {
    let expires_at = client
        .state()
        .expires_at
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .map(|at| at.to_rfc3339());

    Json(RefreshedResponse {
        server_url: client.server_url().to_string(),
        expires_at,
    })
}

pub async fn logout(
    State(smart): State<Arc<SmartAuth>>,
    req: Request<Body>,
) -> Result<&'static str, AppError> {
    let (parts, _body) = req.into_parts();

    if smart.logout(&parts.extensions).await? {
        tracing::info!("authorization removed from session");
        Ok("Logged out.")
    } else {
        Ok("Nothing to log out.")
    }
}
