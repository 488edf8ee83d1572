/*
 * Responsibility
 * - The post-authorization landing page: show the launch patient (or the server) using
 *   the session's FhirClient
 */
use axum::Json;
use chrono::Utc;
use serde_json::{Value, json};

use crate::api::extractors::SmartClient;
use crate::error::AppError;

pub async fn show_patient(SmartClient(client): SmartClient) -> Result<Json<Value>, AppError> {
    if client.is_expired(Utc::now()) {
        tracing::debug!(server = %client.server_url(), "access token expired; /refresh renews it");
    }

    let Some(patient_id) = client.patient_id() else {
        return Ok(Json(json!({
            "serverUrl": client.server_url(),
            "patient": null,
        })));
    };

    let patient = client.request(&format!("Patient/{patient_id}")).await?;
    Ok(Json(patient))
}
