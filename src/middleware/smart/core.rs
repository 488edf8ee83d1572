use axum::{
    body::Body,
    extract::State,
    http::{Extensions, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::phase::RequestPhase;
use crate::config::SmartOptions;
use crate::error::AppError;
use crate::services::client_state::ClientStateStore;
use crate::services::fhir_client::FhirClient;
use crate::services::oauth::{OAuthCore, SmartOAuth};
use crate::services::session::Session;
use crate::services::storage::{
    SessionStorageFactory, StorageAdapter, StorageError, StorageFactory,
};

/// The SMART authorization middleware.
///
/// Built once at startup; immutable afterwards. Mount the three entry points
/// with `axum::middleware::from_fn_with_state(Arc<SmartAuth>, ...)`:
///
/// ```ignore
/// let smart = Arc::new(SmartAuth::new(options));
/// Router::new()
///     .route("/launch", get(not_a_launch).layer(from_fn_with_state(smart.clone(), authorize)))
///     .route("/callback", get(not_a_callback).layer(from_fn_with_state(smart.clone(), complete_auth)))
///     .route("/refresh", get(refreshed).layer(from_fn_with_state(smart, refresh_auth)));
/// ```
pub struct SmartAuth {
    options: SmartOptions,
    oauth: Arc<dyn OAuthCore>,
    storage: Arc<dyn StorageFactory>,
    http: reqwest::Client,
}

impl SmartAuth {
    /// Defaults: [`SmartOAuth`] for the protocol, the request session for storage.
    pub fn new(options: SmartOptions) -> Self {
        let http = reqwest::Client::new();
        Self {
            options,
            oauth: Arc::new(SmartOAuth::new(http.clone())),
            storage: Arc::new(SessionStorageFactory),
            http,
        }
    }

    pub fn with_oauth(mut self, oauth: Arc<dyn OAuthCore>) -> Self {
        self.oauth = oauth;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn StorageFactory>) -> Self {
        self.storage = storage;
        self
    }

    /// HTTP client handed to rehydrated [`FhirClient`]s.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn options(&self) -> &SmartOptions {
        &self.options
    }

    pub fn storage(&self, extensions: &Extensions) -> Result<Arc<dyn StorageAdapter>, StorageError> {
        self.storage.storage(extensions)
    }

    pub fn phase<B>(&self, req: &Request<B>) -> RequestPhase {
        RequestPhase::classify(req.uri().query(), self.options.server_url.is_some())
    }

    /// Rehydrate the current client, or `None` when this session is not authorized.
    pub async fn get_client(&self, extensions: &Extensions) -> Result<Option<FhirClient>, StorageError> {
        let storage = self.storage(extensions)?;
        self.client_from(storage).await
    }

    async fn client_from(
        &self,
        storage: Arc<dyn StorageAdapter>,
    ) -> Result<Option<FhirClient>, StorageError> {
        let resolved = ClientStateStore::new(storage.as_ref()).resolve().await?;

        Ok(resolved.map(|(key, state)| FhirClient::new(self.http.clone(), key, state, storage)))
    }

    /// Forget the current authorization (pointer and state blob).
    pub async fn logout(&self, extensions: &Extensions) -> Result<bool, StorageError> {
        let storage = self.storage(extensions)?;
        ClientStateStore::new(storage.as_ref()).clear().await
    }
}

/// Start the authorization flow when the request looks like a launch; otherwise `next`.
pub async fn authorize(
    State(smart): State<Arc<SmartAuth>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let RequestPhase::Launch(launch) = smart.phase(&req) else {
        return Ok(next.run(req).await);
    };

    let storage = smart.storage(req.extensions())?;

    let url = smart
        .oauth
        .authorize(&launch, &smart.options, storage.as_ref())
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "failed to start authorization");
            AppError::from(err)
        })?;

    Ok(found(url.as_str()))
}

/// Handle the authorization server's callback; anything that is not a callback goes to `next`.
pub async fn complete_auth(
    State(smart): State<Arc<SmartAuth>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let callback = match smart.phase(&req) {
        RequestPhase::ErrorCallback { error, description } => {
            tracing::warn!(%error, description = description.as_deref().unwrap_or(""), "authorization server returned an error");
            return Err(AppError::AuthorizationDenied { error, description });
        }
        RequestPhase::Callback(callback) => callback,
        RequestPhase::Launch(_) | RequestPhase::Unrelated => return Ok(next.run(req).await),
    };

    let storage = smart.storage(req.extensions())?;
    let session = req.extensions().get::<Session>().cloned();

    if let Err(err) = smart.oauth.complete_auth(&callback, storage.as_ref()).await {
        tracing::error!(status = %err.status(), error = %err, "code exchange failed");
        return Err(err.into());
    }

    // New privileges, new session id: a cookie planted before the login is useless afterwards.
    if let Some(session) = session {
        session.cycle_id().await?;
    }

    Ok(found(&smart.options.redirect_uri))
}

/// Force a token refresh for the current client, then `next`.
///
/// Without an authorization in this session the lost-session message is the response.
pub async fn refresh_auth(
    State(smart): State<Arc<SmartAuth>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let storage = smart.storage(req.extensions())?;
    let Some(mut client) = smart.client_from(storage).await? else {
        tracing::info!("refresh requested without an authorization in the session");
        return Err(AppError::LostSession);
    };

    let refreshed = client.refresh().await.map(|_| ());
    if let Err(err) = refreshed {
        tracing::warn!(error = %err, server = %client.server_url(), "token refresh failed");
        return Err(err.into());
    }

    req.extensions_mut().insert(client);

    Ok(next.run(req).await)
}

// 302 Found (axum's `Redirect::to` answers 303).
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
