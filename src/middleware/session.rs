//! Cookie-backed session layer (`tower-sessions`).
//!
//! Responsibility:
//! - Resolve the `smart_session` cookie to a [`Session`] in request extensions
//! - Persist modified sessions after the inner service ran and before the response
//!   leaves, so anything written before a redirect is visible to the request that follows
//! - Issue the cookie once a session has been written to
//!
//! Sessions that are never written to are never stored and get no cookie.
//!
//! [`Session`]: tower_sessions::Session

use axum::Router;
use std::time::Duration;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, SessionManagerLayer};

use crate::services::session::SessionBackend;

pub const SESSION_COOKIE_NAME: &str = "smart_session";

#[derive(Clone, Debug)]
pub struct SessionSettings {
    pub store: SessionBackend,
    // Idle lifetime; every saved write extends it.
    pub ttl: Duration,
    // `Secure` cookie attribute; off in development (plain http on localhost).
    pub secure_cookie: bool,
}

impl SessionSettings {
    /// In-memory sessions, plain-http cookies.
    pub fn in_memory(ttl: Duration) -> Self {
        Self {
            store: SessionBackend::memory(),
            ttl,
            secure_cookie: false,
        }
    }
}

pub fn apply<S>(router: Router<S>, settings: SessionSettings) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let idle = time::Duration::seconds(i64::try_from(settings.ttl.as_secs()).unwrap_or(i64::MAX));

    let layer = SessionManagerLayer::new(settings.store)
        .with_name(SESSION_COOKIE_NAME)
        .with_http_only(true)
        .with_secure(settings.secure_cookie)
        .with_same_site(SameSite::Lax)
        .with_path("/")
        .with_expiry(Expiry::OnInactivity(idle));

    router.layer(layer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, header},
        response::Response,
        routing::get,
    };
    use tower::ServiceExt;
    use tower_sessions::Session;
    use tower_sessions::session::Id;

    fn router() -> Router {
        let app = Router::new()
            .route(
                "/write",
                get(|session: Session| async move {
                    session.insert("smartId", "k1").await.unwrap();
                    "written"
                }),
            )
            .route(
                "/read",
                get(|session: Session| async move {
                    session
                        .get::<String>("smartId")
                        .await
                        .unwrap()
                        .unwrap_or_else(|| "none".to_string())
                }),
            );

        apply(app, SessionSettings::in_memory(Duration::from_secs(60)))
    }

    async fn body(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn read_only_requests_get_no_cookie() {
        let resp = router()
            .oneshot(Request::builder().uri("/read").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(resp.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(body(resp).await, "none");
    }

    #[tokio::test]
    async fn written_session_is_restored_from_cookie() {
        let app = router();

        let resp = app
            .clone()
            .oneshot(Request::builder().uri("/write").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let set_cookie = resp
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(set_cookie.starts_with(SESSION_COOKIE_NAME));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("SameSite=Lax"));

        let cookie = set_cookie.split(';').next().unwrap().to_string();
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/read")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body(resp).await, "k1");
    }

    #[tokio::test]
    async fn unknown_session_id_starts_fresh() {
        let resp = router()
            .oneshot(
                Request::builder()
                    .uri("/read")
                    .header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={}", Id::default()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(body(resp).await, "none");
    }
}
