/*
 * Responsibility
 * - Shared context bound to the Router (AppState)
 * - Clone is cheap (Arc inside)
 */
use axum::extract::FromRef;
use std::sync::Arc;

use crate::middleware::session::SessionSettings;
use crate::middleware::smart::SmartAuth;

#[derive(Clone)]
pub struct AppState {
    pub smart: Arc<SmartAuth>,
    pub sessions: SessionSettings,
}

impl AppState {
    pub fn new(smart: Arc<SmartAuth>, sessions: SessionSettings) -> Self {
        Self { smart, sessions }
    }
}

impl FromRef<AppState> for Arc<SmartAuth> {
    fn from_ref(state: &AppState) -> Self {
        state.smart.clone()
    }
}
