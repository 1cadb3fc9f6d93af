//! Tests for the gateway against a local mock backend.
#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use super::{ApiRequest, Gateway, Service};
use crate::error::ClientError;
use crate::events::{EventBus, NoticeLevel, SessionEvent};
use crate::session::SessionStore;
use crate::test_support::{gateway, next_event, principal, session, settings_for, spawn_backend};

// =============================================================================
// Mock backend
// =============================================================================

#[derive(Debug, Clone)]
enum RefreshReply {
    Rotate {
        token: String,
        refresh_token: Option<String>,
    },
    Status(u16),
    Malformed,
}

#[derive(Debug)]
struct Backend {
    valid_token: Mutex<String>,
    always_unauthorized: AtomicBool,
    refresh_reply: Mutex<RefreshReply>,
    refresh_delay_ms: AtomicU64,
    refresh_calls: AtomicUsize,
    refresh_bodies: Mutex<Vec<Value>>,
    seen_auth: Mutex<Vec<Option<String>>>,
    logout_calls: AtomicUsize,
}

impl Backend {
    fn accepting(token: &str) -> Arc<Self> {
        Arc::new(Self {
            valid_token: Mutex::new(token.to_string()),
            always_unauthorized: AtomicBool::new(false),
            refresh_reply: Mutex::new(RefreshReply::Status(500)),
            refresh_delay_ms: AtomicU64::new(0),
            refresh_calls: AtomicUsize::new(0),
            refresh_bodies: Mutex::new(Vec::new()),
            seen_auth: Mutex::new(Vec::new()),
            logout_calls: AtomicUsize::new(0),
        })
    }

    fn reply_to_refresh(&self, reply: RefreshReply) {
        *self.refresh_reply.lock().unwrap() = reply;
    }

    fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    fn seen_auth(&self) -> Vec<Option<String>> {
        self.seen_auth.lock().unwrap().clone()
    }

    fn router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/api/protected", get(protected))
            .route("/api/boom", get(boom))
            .route("/api/echo", get(echo))
            .route("/api/users/refresh-token", post(refresh))
            .route("/api/users/login", post(login))
            .route("/api/users/logout", post(logout))
            .route("/containers", get(forecast_unauthorized))
            .with_state(Arc::clone(self))
    }
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

async fn protected(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    let auth = bearer(&headers);
    b.seen_auth.lock().unwrap().push(auth.clone());
    let expected = format!("Bearer {}", b.valid_token.lock().unwrap());
    if b.always_unauthorized.load(Ordering::SeqCst) || auth.as_deref() != Some(expected.as_str()) {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthorized"}))).into_response();
    }
    Json(json!({"ok": true})).into_response()
}

async fn boom() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"message": "Datenbank nicht erreichbar"})),
    )
        .into_response()
}

async fn echo(RawQuery(query): RawQuery) -> String {
    query.unwrap_or_default()
}

async fn refresh(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    b.refresh_calls.fetch_add(1, Ordering::SeqCst);
    b.refresh_bodies.lock().unwrap().push(body);
    let delay = b.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let reply = b.refresh_reply.lock().unwrap().clone();
    match reply {
        RefreshReply::Rotate {
            token,
            refresh_token,
        } => {
            *b.valid_token.lock().unwrap() = token.clone();
            Json(json!({"token": token, "refreshToken": refresh_token})).into_response()
        }
        RefreshReply::Status(code) => StatusCode::from_u16(code).unwrap().into_response(),
        RefreshReply::Malformed => Json(json!({"accessToken": "wrong-key"})).into_response(),
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] == "geheim" {
        let mut value = serde_json::to_value(principal()).unwrap();
        value["token"] = json!("t-login");
        value["refreshToken"] = json!("r-login");
        return Json(value).into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "Login fehlgeschlagen."})),
    )
        .into_response()
}

async fn logout(State(b): State<Arc<Backend>>) -> StatusCode {
    b.logout_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn forecast_unauthorized() -> StatusCode {
    StatusCode::UNAUTHORIZED
}

async fn expect_expiry_events(rx: &mut tokio::sync::broadcast::Receiver<SessionEvent>) {
    assert_eq!(
        next_event(rx).await,
        SessionEvent::Notice {
            level: NoticeLevel::Error,
            message: "Session expired.".into()
        }
    );
    assert_eq!(next_event(rx).await, SessionEvent::RedirectToLogin);
}

// =============================================================================
// Pass-through
// =============================================================================

#[tokio::test]
async fn valid_token_is_attached_and_no_refresh_happens() {
    let backend = Backend::accepting("t1");
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));

    let body: Value = gw
        .send_json(Service::Core, ApiRequest::get("/api/protected"))
        .await
        .unwrap();

    assert_eq!(body["ok"], true);
    assert_eq!(backend.refresh_calls(), 0);
    assert_eq!(backend.seen_auth(), vec![Some("Bearer t1".to_string())]);
}

#[tokio::test]
async fn query_pairs_are_encoded() {
    let backend = Backend::accepting("t1");
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));

    let response = gw
        .send(
            ApiRequest::get("/api/echo")
                .query("level", "Error")
                .query("user", "a b&c"),
        )
        .await
        .unwrap();

    assert_eq!(response.text(), "level=Error&user=a+b%26c");
}

#[tokio::test]
async fn server_error_surfaces_backend_message_without_refresh() {
    let backend = Backend::accepting("t1");
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));

    let err = gw.send(ApiRequest::get("/api/boom")).await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.user_message(), "Datenbank nicht erreichbar");
    assert_eq!(backend.refresh_calls(), 0);
    assert!(gw.session().is_authenticated());
}

#[tokio::test]
async fn unreachable_backend_is_reported() {
    let gw = gateway("http://127.0.0.1:1", Some(session("t1", "r1")));
    let mut rx = gw.events();

    let err = gw.send(ApiRequest::get("/api/protected")).await.unwrap_err();

    assert!(matches!(err, ClientError::NetworkUnreachable(_)));
    assert_eq!(
        next_event(&mut rx).await,
        SessionEvent::Notice {
            level: NoticeLevel::Error,
            message: "Network error or server unreachable.".into()
        }
    );
    assert!(gw.session().is_authenticated());
}

// =============================================================================
// Refresh and retry
// =============================================================================

#[tokio::test]
async fn expired_token_is_refreshed_and_request_retried() {
    let backend = Backend::accepting("t2");
    backend.reply_to_refresh(RefreshReply::Rotate {
        token: "t2".into(),
        refresh_token: None,
    });
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));

    let response = gw.send(ApiRequest::get("/api/protected")).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(
        backend.refresh_bodies.lock().unwrap().as_slice(),
        &[json!({"refreshToken": "r1"})]
    );
    assert_eq!(
        backend.seen_auth(),
        vec![Some("Bearer t1".to_string()), Some("Bearer t2".to_string())]
    );
    let current = gw.session().current().unwrap();
    assert_eq!(current.token, "t2");
    assert_eq!(current.refresh_token, "r1");
}

#[tokio::test]
async fn rotated_refresh_token_is_stored() {
    let backend = Backend::accepting("t2");
    backend.reply_to_refresh(RefreshReply::Rotate {
        token: "t2".into(),
        refresh_token: Some("r2".into()),
    });
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));

    gw.send(ApiRequest::get("/api/protected")).await.unwrap();

    assert_eq!(gw.session().refresh_token().as_deref(), Some("r2"));
}

#[tokio::test]
async fn refresh_network_failure_expires_session() {
    let backend = Backend::accepting("t2");
    backend.refresh_delay_ms.store(3_000, Ordering::SeqCst);
    let base = spawn_backend(backend.router()).await;

    let mut settings = settings_for(&base);
    settings.http.request_timeout_secs = 1;
    let store = Arc::new(SessionStore::in_memory());
    store.replace(session("t1", "r1")).unwrap();
    let gw = Gateway::new(&settings, store, EventBus::default()).unwrap();
    let mut rx = gw.events();

    let err = gw.send(ApiRequest::get("/api/protected")).await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(gw.session().current().is_none());
    expect_expiry_events(&mut rx).await;
    assert_eq!(backend.seen_auth().len(), 1);
}

#[tokio::test]
async fn refresh_rejection_expires_session() {
    let backend = Backend::accepting("t2");
    backend.reply_to_refresh(RefreshReply::Status(401));
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));
    let mut rx = gw.events();

    let err = gw.send(ApiRequest::get("/api/protected")).await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(!gw.session().is_authenticated());
    expect_expiry_events(&mut rx).await;
}

#[tokio::test]
async fn refresh_response_without_token_expires_session() {
    let backend = Backend::accepting("t2");
    backend.reply_to_refresh(RefreshReply::Malformed);
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));

    let err = gw.send(ApiRequest::get("/api/protected")).await.unwrap_err();

    assert!(err.is_session_expired());
    assert!(!gw.session().is_authenticated());
}

#[tokio::test]
async fn unauthorized_without_session_expires_without_refresh() {
    let backend = Backend::accepting("t1");
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, None);
    let mut rx = gw.events();

    let err = gw.send(ApiRequest::get("/api/protected")).await.unwrap_err();

    assert!(err.is_session_expired());
    assert_eq!(backend.refresh_calls(), 0);
    assert_eq!(backend.seen_auth(), vec![None]);
    expect_expiry_events(&mut rx).await;
}

#[tokio::test]
async fn persistent_unauthorized_refreshes_once_then_fails() {
    let backend = Backend::accepting("t2");
    backend.always_unauthorized.store(true, Ordering::SeqCst);
    backend.reply_to_refresh(RefreshReply::Rotate {
        token: "t2".into(),
        refresh_token: None,
    });
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));

    let err = gw.send(ApiRequest::get("/api/protected")).await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(backend.seen_auth().len(), 2);
}

#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    let backend = Backend::accepting("t2");
    backend.refresh_delay_ms.store(100, Ordering::SeqCst);
    backend.reply_to_refresh(RefreshReply::Rotate {
        token: "t2".into(),
        refresh_token: Some("r2".into()),
    });
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));

    let (a, b) = tokio::join!(
        gw.send(ApiRequest::get("/api/protected")),
        gw.send(ApiRequest::get("/api/protected")),
    );

    a.unwrap();
    b.unwrap();
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(gw.session().access_token().as_deref(), Some("t2"));
}

#[tokio::test]
async fn request_waiting_on_a_failed_refresh_expires_quietly() {
    let backend = Backend::accepting("t2");
    backend.refresh_delay_ms.store(100, Ordering::SeqCst);
    backend.reply_to_refresh(RefreshReply::Status(401));
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));
    let mut rx = gw.events();

    let (a, b) = tokio::join!(
        gw.send(ApiRequest::get("/api/protected")),
        gw.send(ApiRequest::get("/api/protected")),
    );

    assert!(a.unwrap_err().is_session_expired());
    assert!(b.unwrap_err().is_session_expired());
    assert_eq!(backend.refresh_calls(), 1);
    assert!(!gw.session().is_authenticated());
    expect_expiry_events(&mut rx).await;
    let extra = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
    assert!(extra.is_err(), "unexpected extra event: {extra:?}");
}

#[tokio::test]
async fn forecast_service_never_refreshes() {
    let backend = Backend::accepting("t1");
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));

    let err = gw
        .send_to(Service::Forecast, ApiRequest::get("/containers"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(backend.refresh_calls(), 0);
    assert!(gw.session().is_authenticated());
}

#[tokio::test]
async fn explicit_refresh_failure_keeps_session() {
    let backend = Backend::accepting("t1");
    backend.reply_to_refresh(RefreshReply::Malformed);
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));

    let err = gw.refresh_session().await.unwrap_err();

    assert!(matches!(err, ClientError::RefreshResponseInvalid));
    assert_eq!(gw.session().access_token().as_deref(), Some("t1"));
}

// =============================================================================
// Login / logout
// =============================================================================

#[tokio::test]
async fn login_stores_session() {
    let backend = Backend::accepting("t-login");
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, None);

    let session = gw.login("bob@wilma.test", "geheim").await.unwrap();

    assert_eq!(session.principal.username, "bob");
    assert_eq!(gw.session().access_token().as_deref(), Some("t-login"));
    assert_eq!(gw.session().refresh_token().as_deref(), Some("r-login"));
}

#[tokio::test]
async fn failed_login_does_not_refresh() {
    let backend = Backend::accepting("t1");
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, None);

    let err = gw.login("bob@wilma.test", "falsch").await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.user_message(), "Login fehlgeschlagen.");
    assert_eq!(backend.refresh_calls(), 0);
    assert!(!gw.session().is_authenticated());
}

#[tokio::test]
async fn logout_notifies_backend_and_clears_session() {
    let backend = Backend::accepting("t1");
    let base = spawn_backend(backend.router()).await;
    let gw = gateway(&base, Some(session("t1", "r1")));

    gw.logout().await.unwrap();

    assert_eq!(backend.logout_calls.load(Ordering::SeqCst), 1);
    assert!(!gw.session().is_authenticated());
}
