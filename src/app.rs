/*
 * Responsibility
 * - Config loading -> dependency construction -> Router assembly
 * - Middleware order: http (outermost) -> session -> route-level SMART middleware
 * - axum::serve() startup
 */
use anyhow::Result;
use axum::Router;
use std::{panic, process, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware::{self, session::SessionSettings, smart::SmartAuth};
use crate::services::session::{CacheSessionStore, SessionBackend};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,smart_session=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Surface panics via tracing so they don't get lost when stderr is hidden.
        tracing::error!(?info, "panic");

        // Development: crash the whole process so it gets noticed.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting SMART app in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub async fn build_state(config: &Config) -> Result<AppState> {
    let store = match config.valkey_url.as_deref() {
        Some(url) => SessionBackend::Valkey(CacheSessionStore::connect(url).await?),
        None => {
            tracing::warn!("VALKEY_URL not set; sessions are kept in memory and lost on restart");
            SessionBackend::memory()
        }
    };
    tracing::info!(backend = store.name(), "session store ready");

    let sessions = SessionSettings {
        store,
        ttl: config.session_ttl,
        secure_cookie: config.app_env.is_production(),
    };

    let smart = Arc::new(SmartAuth::new(config.smart.clone()));

    Ok(AppState::new(smart, sessions))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .merge(api::routes(state.smart.clone()))
        .with_state(state.clone());

    let router = middleware::session::apply(router, state.sessions);
    middleware::http::apply(router, config.request_timeout)
}
