use async_trait::async_trait;
use url::Url;
use uuid::Uuid;

use super::core::{CallbackParams, LaunchParams, OAuthCore, OAuthError};
use super::discovery::{self, SmartConfiguration};
use super::pkce::{Pkce, S256};
use super::token;
use crate::config::SmartOptions;
use crate::services::client_state::{ClientState, ClientStateStore};
use crate::services::storage::StorageAdapter;

/// Default [`OAuthCore`]: SMART App Launch over reqwest.
#[derive(Clone, Debug, Default)]
pub struct SmartOAuth {
    http: reqwest::Client,
}

impl SmartOAuth {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl OAuthCore for SmartOAuth {
    async fn authorize(
        &self,
        launch: &LaunchParams,
        options: &SmartOptions,
        storage: &dyn StorageAdapter,
    ) -> Result<Url, OAuthError> {
        let server = server_url(launch, options)?;
        let smart = discovery::discover(&self.http, &server).await?;

        // The storage key doubles as the OAuth `state` nonce.
        let key = Uuid::new_v4().simple().to_string();
        let pkce = smart.uses_pkce().then(Pkce::generate);

        let state = ClientState {
            server_url: discovery::base_url(&server),
            client_id: options.client_id.clone(),
            client_secret: options.client_secret.clone(),
            scope: launch_scope(&options.scope, launch.launch.is_some()),
            redirect_uri: options.callback_uri.to_string(),
            authorize_uri: smart.authorization_endpoint.clone(),
            token_uri: smart.token_endpoint.clone(),
            code_verifier: pkce.as_ref().map(|p| p.verifier.clone()),
            launch: launch.launch.clone(),
            token_response: None,
            expires_at: None,
        };

        // Must be stored before the redirect goes out, or the callback cannot be matched.
        ClientStateStore::new(storage)
            .save_pending(&key, &state)
            .await?;

        let url = authorize_url(&state, &smart, &key, pkce.as_ref())?;

        tracing::info!(
            server = %state.server_url,
            ehr_launch = state.launch.is_some(),
            pkce = pkce.is_some(),
            "redirecting to authorization endpoint"
        );

        Ok(url)
    }

    async fn complete_auth(
        &self,
        callback: &CallbackParams,
        storage: &dyn StorageAdapter,
    ) -> Result<ClientState, OAuthError> {
        let store = ClientStateStore::new(storage);

        let mut state = store
            .load_pending(&callback.state)
            .await?
            .ok_or_else(|| OAuthError::StateNotFound(callback.state.clone()))?;

        token::exchange_code(&self.http, &mut state, &callback.code).await?;

        store.complete(&callback.state, &state).await?;

        tracing::info!(
            server = %state.server_url,
            patient = state.patient().unwrap_or("-"),
            "authorization completed"
        );

        Ok(state)
    }
}

/// Query parameters win over the configured server: `iss`, then `fhirServiceUrl`.
fn server_url(launch: &LaunchParams, options: &SmartOptions) -> Result<Url, OAuthError> {
    let raw = launch
        .iss
        .as_deref()
        .or(launch.fhir_service_url.as_deref());

    match raw {
        Some(raw) => match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
            _ => Err(OAuthError::InvalidServerUrl(raw.to_string())),
        },
        None => options
            .server_url
            .clone()
            .ok_or(OAuthError::MissingServerUrl),
    }
}

// An EHR launch needs the `launch` scope for the server to honour the launch id.
fn launch_scope(scope: &str, ehr_launch: bool) -> String {
    if ehr_launch && !scope.split_whitespace().any(|s| s == "launch") {
        format!("{} launch", scope.trim()).trim().to_string()
    } else {
        scope.to_string()
    }
}

fn authorize_url(
    state: &ClientState,
    smart: &SmartConfiguration,
    key: &str,
    pkce: Option<&Pkce>,
) -> Result<Url, OAuthError> {
    let mut url = Url::parse(&smart.authorization_endpoint)
        .map_err(|_| OAuthError::InvalidEndpoint(smart.authorization_endpoint.clone()))?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("response_type", "code")
            .append_pair("client_id", &state.client_id)
            .append_pair("scope", &state.scope)
            .append_pair("redirect_uri", &state.redirect_uri)
            .append_pair("aud", &state.server_url)
            .append_pair("state", key);

        if let Some(launch) = state.launch.as_deref() {
            query.append_pair("launch", launch);
        }
        if let Some(pkce) = pkce {
            query
                .append_pair("code_challenge", &pkce.challenge)
                .append_pair("code_challenge_method", S256);
        }
    }

    Ok(url)
}
