/*
 * Responsibility
 * - Load environment variables (SMART client registration, session store, listen port)
 * - Validate configuration values (fail startup when something required is missing)
 * - SmartOptions: the static, immutable option set handed to the SMART middleware
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

pub const DEFAULT_SCOPE: &str = "launch openid fhirUser offline_access patient/*.read";
pub const DEFAULT_REDIRECT_URI: &str = "/app";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Options the SMART middleware is built with.
///
/// - `server_url`: static FHIR base. When set, `authorize` redirects even without
///   `iss`/`fhirServiceUrl` query parameters.
/// - `callback_uri`: the OAuth `redirect_uri` registered with the authorization server
///   (the route `complete_auth` is mounted on).
/// - `redirect_uri`: where the browser goes after a successful `complete_auth`.
#[derive(Clone)]
pub struct SmartOptions {
    pub server_url: Option<Url>,
    pub callback_uri: Url,
    pub redirect_uri: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub scope: String,
}

impl SmartOptions {
    pub fn new(client_id: impl Into<String>, callback_uri: Url) -> Self {
        Self {
            server_url: None,
            callback_uri,
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            client_id: client_id.into(),
            client_secret: None,
            scope: DEFAULT_SCOPE.to_string(),
        }
    }

    pub fn with_server_url(mut self, server_url: Url) -> Self {
        self.server_url = Some(server_url);
        self
    }

    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }
}

// The client secret is intentionally not printable via Debug.
impl fmt::Debug for SmartOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartOptions")
            .field("server_url", &self.server_url.as_ref().map(Url::as_str))
            .field("callback_uri", &self.callback_uri.as_str())
            .field("redirect_uri", &self.redirect_uri)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("scope", &self.scope)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    pub smart: SmartOptions,

    // Session store: Valkey when configured, in-process memory otherwise.
    pub valkey_url: Option<String>,
    pub session_ttl: Duration,

    pub request_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let client_id = std::env::var("SMART_CLIENT_ID")
            .map_err(|_| ConfigError::Missing("SMART_CLIENT_ID"))?;

        let callback_uri = std::env::var("SMART_CALLBACK_URI")
            .map_err(|_| ConfigError::Missing("SMART_CALLBACK_URI"))
            .and_then(|v| Url::parse(&v).map_err(|_| ConfigError::Invalid("SMART_CALLBACK_URI")))?;

        let mut smart = SmartOptions::new(client_id, callback_uri);

        if let Some(server_url) = non_empty_var("SMART_SERVER_URL") {
            let server_url =
                Url::parse(&server_url).map_err(|_| ConfigError::Invalid("SMART_SERVER_URL"))?;
            smart = smart.with_server_url(server_url);
        }
        if let Some(secret) = non_empty_var("SMART_CLIENT_SECRET") {
            smart = smart.with_client_secret(secret);
        }
        if let Some(scope) = non_empty_var("SMART_SCOPE") {
            smart = smart.with_scope(scope);
        }
        if let Some(redirect_uri) = non_empty_var("SMART_REDIRECT_URI") {
            smart = smart.with_redirect_uri(redirect_uri);
        }

        let valkey_url = non_empty_var("VALKEY_URL");

        let session_ttl_seconds = std::env::var("SESSION_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(3600);

        let request_timeout_seconds = std::env::var("REQUEST_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(30);

        Ok(Self {
            addr,
            app_env,
            smart,
            valkey_url,
            session_ttl: Duration::from_secs(session_ttl_seconds),
            request_timeout: Duration::from_secs(request_timeout_seconds),
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_client_secret() {
        let callback = Url::parse("https://app.example.org/callback").unwrap();
        let options = SmartOptions::new("my-app", callback).with_client_secret("s3cr3t");

        let printed = format!("{options:?}");
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("s3cr3t"));
    }

    #[test]
    fn defaults_use_app_destination_and_launch_scope() {
        let callback = Url::parse("https://app.example.org/callback").unwrap();
        let options = SmartOptions::new("my-app", callback);

        assert_eq!(options.redirect_uri, "/app");
        assert!(options.scope.split(' ').any(|s| s == "launch"));
        assert!(options.server_url.is_none());
    }
}
