//! Which step of the SMART flow a request belongs to.
//!
//! Computed once per request from the query string (plus whether a server url
//! is configured), then dispatched on. No phase is ever stored.
use std::collections::HashMap;

use crate::services::oauth::{CallbackParams, LaunchParams};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestPhase {
    /// The authorization server reported a failure (`error`, `error_description`).
    ErrorCallback {
        error: String,
        description: Option<String>,
    },
    /// The authorization server sent us back a `code` and our `state`.
    Callback(CallbackParams),
    /// A launch: `launch` + `iss`, `fhirServiceUrl`, or a configured server url.
    Launch(LaunchParams),
    /// Not part of the authorization flow.
    Unrelated,
}

impl RequestPhase {
    /// Precedence: `error` > `code`+`state` > launch parameters > unrelated.
    /// Empty values count as absent; for repeated keys the first one wins.
    pub fn classify(query: Option<&str>, has_configured_server: bool) -> Self {
        let params = parse_query(query.unwrap_or_default());
        let param = |name: &str| params.get(name).cloned();

        if let Some(error) = param("error") {
            return Self::ErrorCallback {
                error,
                description: param("error_description"),
            };
        }

        if let (Some(code), Some(state)) = (param("code"), param("state")) {
            return Self::Callback(CallbackParams { code, state });
        }

        let launch = LaunchParams {
            launch: param("launch"),
            iss: param("iss"),
            fhir_service_url: param("fhirServiceUrl"),
        };
        let ehr_launch = launch.launch.is_some() && launch.iss.is_some();

        if ehr_launch || launch.fhir_service_url.is_some() || has_configured_server {
            return Self::Launch(launch);
        }

        Self::Unrelated
    }
}

fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        params
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn launch(launch: Option<&str>, iss: Option<&str>, fsu: Option<&str>) -> RequestPhase {
        RequestPhase::Launch(LaunchParams {
            launch: launch.map(str::to_owned),
            iss: iss.map(str::to_owned),
            fhir_service_url: fsu.map(str::to_owned),
        })
    }

    #[test]
    fn no_parameters_without_configured_server_is_unrelated() {
        assert_eq!(RequestPhase::classify(None, false), RequestPhase::Unrelated);
        assert_eq!(RequestPhase::classify(Some(""), false), RequestPhase::Unrelated);
    }

    #[test]
    fn configured_server_turns_a_bare_request_into_a_launch() {
        assert_eq!(
            RequestPhase::classify(None, true),
            launch(None, None, None)
        );
    }

    #[test]
    fn ehr_launch_needs_both_launch_and_iss() {
        let iss = "https%3A%2F%2Fehr.example.org%2Ffhir";
        assert_eq!(
            RequestPhase::classify(Some(&format!("launch=abc&iss={iss}")), false),
            launch(Some("abc"), Some("https://ehr.example.org/fhir"), None)
        );
        assert_eq!(
            RequestPhase::classify(Some("launch=abc"), false),
            RequestPhase::Unrelated
        );
        assert_eq!(
            RequestPhase::classify(Some(&format!("iss={iss}")), false),
            RequestPhase::Unrelated
        );
    }

    #[test]
    fn standalone_launch_via_fhir_service_url() {
        assert_eq!(
            RequestPhase::classify(Some("fhirServiceUrl=https://fhir.example.org"), false),
            launch(None, None, Some("https://fhir.example.org"))
        );
    }

    #[test]
    fn callback_needs_both_code_and_state() {
        assert_eq!(
            RequestPhase::classify(Some("code=abc&state=xyz"), false),
            RequestPhase::Callback(CallbackParams {
                code: "abc".into(),
                state: "xyz".into()
            })
        );
        assert_eq!(
            RequestPhase::classify(Some("code=abc"), false),
            RequestPhase::Unrelated
        );
        assert_eq!(
            RequestPhase::classify(Some("state=xyz"), false),
            RequestPhase::Unrelated
        );
    }

    #[test]
    fn error_wins_over_code_and_state() {
        assert_eq!(
            RequestPhase::classify(
                Some("error=access_denied&error_description=user+cancelled&code=abc&state=xyz"),
                false
            ),
            RequestPhase::ErrorCallback {
                error: "access_denied".into(),
                description: Some("user cancelled".into()),
            }
        );
    }

    #[test]
    fn callback_wins_over_configured_server() {
        assert!(matches!(
            RequestPhase::classify(Some("code=abc&state=xyz"), true),
            RequestPhase::Callback(_)
        ));
    }

    #[test]
    fn empty_values_count_as_absent() {
        assert_eq!(
            RequestPhase::classify(Some("error=&code=abc&state="), false),
            RequestPhase::Unrelated
        );
    }

    #[test]
    fn first_value_wins_for_repeated_keys() {
        assert_eq!(
            RequestPhase::classify(Some("code=first&code=second&state=s"), false),
            RequestPhase::Callback(CallbackParams {
                code: "first".into(),
                state: "s".into()
            })
        );
    }
}
