//! SMART endpoint discovery.
//!
//! Tries `<server>/.well-known/smart-configuration` first and falls back to the
//! `oauth-uris` extension of the CapabilityStatement at `<server>/metadata`.
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use super::core::OAuthError;
use super::pkce::S256;

const OAUTH_URIS_EXTENSION: &str =
    "http://fhir-registry.smarthealthit.org/StructureDefinition/oauth-uris";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SmartConfiguration {
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(default)]
    pub code_challenge_methods_supported: Vec<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl SmartConfiguration {
    /// S256 when advertised. Servers that list no methods at all (older
    /// discovery documents, CapabilityStatement fallback) get PKCE anyway; it
    /// is ignored by servers that do not support it.
    pub fn uses_pkce(&self) -> bool {
        self.code_challenge_methods_supported.is_empty()
            || self
                .code_challenge_methods_supported
                .iter()
                .any(|m| m == S256)
    }
}

pub fn base_url(server: &Url) -> String {
    server.as_str().trim_end_matches('/').to_string()
}

pub async fn discover(
    http: &reqwest::Client,
    server: &Url,
) -> Result<SmartConfiguration, OAuthError> {
    let base = base_url(server);

    match well_known(http, &base).await {
        Ok(config) => return Ok(config),
        Err(reason) => {
            tracing::debug!(server = %base, %reason, "smart-configuration unavailable, trying metadata");
        }
    }

    capability_statement(http, &base)
        .await
        .map_err(|reason| OAuthError::Discovery {
            server: base.clone(),
            reason,
        })
}

async fn well_known(http: &reqwest::Client, base: &str) -> Result<SmartConfiguration, String> {
    let resp = http
        .get(format!("{base}/.well-known/smart-configuration"))
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !resp.status().is_success() {
        return Err(format!("smart-configuration returned {}", resp.status()));
    }

    resp.json::<SmartConfiguration>()
        .await
        .map_err(|e| e.to_string())
}

async fn capability_statement(
    http: &reqwest::Client,
    base: &str,
) -> Result<SmartConfiguration, String> {
    let resp = http
        .get(format!("{base}/metadata"))
        .header(reqwest::header::ACCEPT, "application/fhir+json")
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if !resp.status().is_success() {
        return Err(format!("metadata returned {}", resp.status()));
    }

    let statement: Value = resp.json().await.map_err(|e| e.to_string())?;
    oauth_uris(&statement).ok_or_else(|| "no oauth-uris extension in CapabilityStatement".into())
}

fn oauth_uris(statement: &Value) -> Option<SmartConfiguration> {
    let extensions = statement
        .get("rest")?
        .as_array()?
        .iter()
        .filter_map(|rest| rest.pointer("/security/extension")?.as_array())
        .flatten()
        .find(|ext| ext.get("url").and_then(Value::as_str) == Some(OAUTH_URIS_EXTENSION))?
        .get("extension")?
        .as_array()?;

    let uri = |name: &str| {
        extensions
            .iter()
            .find(|ext| ext.get("url").and_then(Value::as_str) == Some(name))
            .and_then(|ext| ext.get("valueUri"))
            .and_then(Value::as_str)
            .map(str::to_owned)
    };

    Some(SmartConfiguration {
        authorization_endpoint: uri("authorize")?,
        token_endpoint: uri("token")?,
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_oauth_uris_from_capability_statement() {
        let statement = json!({
            "resourceType": "CapabilityStatement",
            "rest": [{
                "mode": "server",
                "security": {
                    "extension": [{
                        "url": OAUTH_URIS_EXTENSION,
                        "extension": [
                            {"url": "token", "valueUri": "https://auth.example.org/token"},
                            {"url": "authorize", "valueUri": "https://auth.example.org/authorize"}
                        ]
                    }]
                }
            }]
        });

        let config = oauth_uris(&statement).unwrap();
        assert_eq!(config.authorization_endpoint, "https://auth.example.org/authorize");
        assert_eq!(config.token_endpoint, "https://auth.example.org/token");
        assert!(config.uses_pkce());
    }

    #[test]
    fn capability_statement_without_security_yields_nothing() {
        let statement = json!({"resourceType": "CapabilityStatement", "rest": [{"mode": "server"}]});
        assert!(oauth_uris(&statement).is_none());
    }

    #[test]
    fn pkce_skipped_when_only_plain_is_advertised() {
        let config = SmartConfiguration {
            code_challenge_methods_supported: vec!["plain".into()],
            ..Default::default()
        };
        assert!(!config.uses_pkce());
    }
}
