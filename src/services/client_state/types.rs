use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token endpoint response, as returned by the authorization server.
///
/// SMART launch context (`patient`, `encounter`) rides along; anything else the
/// server sends is kept in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The authorization state blob.
///
/// Written as a pending record when a launch starts (no `token_response` yet),
/// completed by the code exchange and updated by refreshes. Stored as camelCase
/// JSON under a random key that doubles as the OAuth `state` nonce.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientState {
    pub server_url: String,
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    pub scope: String,
    // OAuth redirect_uri, needed again for the code exchange.
    pub redirect_uri: String,
    pub authorize_uri: String,
    pub token_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_response: Option<TokenResponse>,
    // Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl ClientState {
    /// Merge a fresh token response.
    ///
    /// Servers that do not rotate refresh tokens omit them from refresh
    /// responses; the previous one stays valid and is kept.
    pub fn apply_token(&mut self, mut token: TokenResponse, now: DateTime<Utc>) {
        if token.refresh_token.is_none() {
            token.refresh_token = self
                .token_response
                .as_ref()
                .and_then(|t| t.refresh_token.clone());
        }
        if token.patient.is_none() {
            token.patient = self.token_response.as_ref().and_then(|t| t.patient.clone());
        }
        if token.encounter.is_none() {
            token.encounter = self
                .token_response
                .as_ref()
                .and_then(|t| t.encounter.clone());
        }

        self.expires_at = token.expires_in.map(|secs| now.timestamp() + secs);
        self.token_response = Some(token);
    }

    pub fn access_token(&self) -> Option<&str> {
        self.token_response
            .as_ref()
            .map(|t| t.access_token.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.token_response
            .as_ref()
            .and_then(|t| t.refresh_token.as_deref())
    }

    pub fn patient(&self) -> Option<&str> {
        self.token_response.as_ref().and_then(|t| t.patient.as_deref())
    }

    /// No access token, or one whose expiry has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if self.access_token().is_none() {
            return true;
        }
        self.expires_at.is_some_and(|at| at <= now.timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn refresh_without_rotation_keeps_refresh_token_and_context() {
        let mut state = ClientState::default();
        state.apply_token(
            TokenResponse {
                access_token: "a1".into(),
                refresh_token: Some("r1".into()),
                patient: Some("123".into()),
                expires_in: Some(300),
                ..Default::default()
            },
            now(),
        );

        state.apply_token(
            TokenResponse {
                access_token: "a2".into(),
                expires_in: Some(600),
                ..Default::default()
            },
            now(),
        );

        assert_eq!(state.access_token(), Some("a2"));
        assert_eq!(state.refresh_token(), Some("r1"));
        assert_eq!(state.patient(), Some("123"));
        assert_eq!(state.expires_at, Some(now().timestamp() + 600));
    }

    #[test]
    fn pending_state_counts_as_expired() {
        let state = ClientState::default();
        assert!(state.is_expired(now()));
    }

    #[test]
    fn unknown_token_fields_survive_a_round_trip() {
        let raw = json!({
            "access_token": "a",
            "token_type": "Bearer",
            "need_patient_banner": true
        });

        let token: TokenResponse = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(token.extra.get("need_patient_banner"), Some(&json!(true)));
        assert_eq!(serde_json::to_value(&token).unwrap(), raw);
    }
}
