//! Shared fixtures for client test modules.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use wilma_core::Settings;

use crate::events::{EventBus, SessionEvent};
use crate::gateway::Gateway;
use crate::session::{Principal, Session, SessionStore};

pub fn principal() -> Principal {
    Principal {
        id: 42,
        username: "bob".into(),
        email: "bob@wilma.test".into(),
        role: "User".into(),
        phone_number: None,
        location: None,
        profile_image_url: None,
    }
}

pub fn session(token: &str, refresh_token: &str) -> Session {
    Session::new(principal(), token, refresh_token)
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_backend(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Settings pointing both services at `base_url`, with a short redirect delay.
pub fn settings_for(base_url: &str) -> Settings {
    let mut settings = Settings::default();
    settings.api.base_url = base_url.to_string();
    settings.forecast.base_url = base_url.to_string();
    settings.session.redirect_delay_ms = 10;
    settings
}

/// Gateway against `base_url` whose store holds `session`, if any.
pub fn gateway(base_url: &str, session: Option<Session>) -> Arc<Gateway> {
    let store = Arc::new(SessionStore::in_memory());
    if let Some(session) = session {
        store.replace(session).unwrap();
    }
    Arc::new(Gateway::new(&settings_for(base_url), store, EventBus::default()).unwrap())
}

/// Next event, failing the test if none arrives within two seconds.
pub async fn next_event(rx: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("no event within 2s")
        .unwrap()
}
