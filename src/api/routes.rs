/*
 * Responsibility
 * - URL layout of the SMART app
 * - Which SMART middleware guards which route (route-level layers)
 */
use axum::{Router, middleware::from_fn_with_state, routing::get};
use std::sync::Arc;

use crate::api::handlers::{
    app::show_patient,
    flow::{logout, not_a_callback, not_a_launch, refreshed},
    health::health,
};
use crate::middleware::smart::{SmartAuth, authorize, complete_auth, refresh_auth};
use crate::state::AppState;

pub fn routes(smart: Arc<SmartAuth>) -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route(
            "/launch",
            get(not_a_launch).layer(from_fn_with_state(smart.clone(), authorize)),
        )
        .route(
            "/callback",
            get(not_a_callback).layer(from_fn_with_state(smart.clone(), complete_auth)),
        )
        .route(
            "/refresh",
            get(refreshed).layer(from_fn_with_state(smart, refresh_auth)),
        )
        .route("/app", get(show_patient))
        .route("/logout", get(logout))
}
