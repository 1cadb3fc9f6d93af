//! Authenticated HTTP gateway.
//!
//! Every backend call goes through [`Gateway::send_to`]. The gateway
//! attaches the current bearer token, and on a 401 from the main API runs a
//! single-flight refresh and re-sends the original request once.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{StatusCode, Url};
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};

use wilma_core::Settings;

use super::request::{ApiRequest, ApiResponse, Attempt, Body, Service};
use crate::error::ClientError;
use crate::events::{EventBus, SessionEvent};
use crate::session::{LoginRequest, RefreshRequest, RefreshResponse, Session, SessionStore};

const LOGIN_PATH: &str = "/api/users/login";
const LOGOUT_PATH: &str = "/api/users/logout";

#[derive(Debug)]
pub struct Gateway {
    http: reqwest::Client,
    api_base: String,
    forecast_base: String,
    refresh_path: String,
    redirect_delay: Duration,
    session: Arc<SessionStore>,
    events: EventBus,
    /// Held for the whole refresh exchange. Waiters re-check the session
    /// token after acquiring it instead of refreshing again.
    refresh_lock: Mutex<()>,
}

impl Gateway {
    pub fn new(
        settings: &Settings,
        session: Arc<SessionStore>,
        events: EventBus,
    ) -> Result<Self, ClientError> {
        let _ = rustls::crypto::ring::default_provider().install_default();
        let http = reqwest::Client::builder()
            .timeout(settings.http.request_timeout())
            .build()
            .map_err(|e| ClientError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_base: settings.api.base_url.trim_end_matches('/').to_string(),
            forecast_base: settings.forecast.base_url.trim_end_matches('/').to_string(),
            refresh_path: settings.api.refresh_path.clone(),
            redirect_delay: settings.session.redirect_delay(),
            session,
            events,
            refresh_lock: Mutex::new(()),
        })
    }

    pub const fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub const fn event_bus(&self) -> &EventBus {
        &self.events
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Send a request to the main API.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        self.send_to(Service::Core, request).await
    }

    /// Send a request and decode a JSON response body.
    pub async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        service: Service,
        request: ApiRequest,
    ) -> Result<T, ClientError> {
        self.send_to(service, request).await?.json()
    }

    /// Send a request to `service`, recovering from one 401 on the main API.
    pub async fn send_to(
        &self,
        service: Service,
        request: ApiRequest,
    ) -> Result<ApiResponse, ClientError> {
        let mut attempt = Attempt::new(request);
        loop {
            let sent_with = self.session.access_token();
            let response = match self.dispatch(service, &attempt.request, sent_with.as_deref()).await {
                Ok(response) => response,
                Err(e) => {
                    if matches!(e, ClientError::NetworkUnreachable(_)) {
                        self.events.error(e.user_message());
                    }
                    return Err(e);
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            if status == StatusCode::UNAUTHORIZED
                && service.refreshes_on_unauthorized()
                && attempt.claim_retry()
            {
                warn!(path = %attempt.request.path, "Unauthorized, refreshing session");
                self.recover_session(sent_with.as_deref()).await?;
                continue;
            }
            return Err(ClientError::Server {
                status: status.as_u16(),
                body: response.text(),
            });
        }
    }

    /// Log in with email and password and store the resulting session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let request = ApiRequest::post(LOGIN_PATH).json(&LoginRequest { email, password })?;
        let response = self.dispatch(Service::Core, &request, None).await?;
        if !response.status().is_success() {
            return Err(ClientError::Server {
                status: response.status().as_u16(),
                body: response.text(),
            });
        }
        let session: Session = response.json()?;
        self.session.replace(session.clone())?;
        info!(user_id = session.principal.id, "Logged in");
        Ok(session)
    }

    /// Tell the backend about the logout, then drop the local session.
    ///
    /// The backend call is best effort; the local session is cleared even if
    /// it fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let Some(current) = self.session.current() else {
            return Ok(());
        };
        let request = ApiRequest::post(LOGOUT_PATH)
            .json(&serde_json::json!({ "email": current.principal.email }))?;
        match self.dispatch(Service::Core, &request, Some(&current.token)).await {
            Ok(response) if response.status().is_success() => debug!("Backend logout acknowledged"),
            Ok(response) => warn!(status = %response.status(), "Backend logout rejected"),
            Err(e) => warn!(error = %e, "Backend logout failed"),
        }
        self.session.clear()
    }

    /// Exchange the refresh token for new credentials right now.
    ///
    /// Unlike the automatic path, a failure here leaves the session intact
    /// and is returned as-is.
    pub async fn refresh_session(&self) -> Result<Session, ClientError> {
        let _guard = self.refresh_lock.lock().await;
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or(ClientError::SessionExpired)?;
        let (token, rotated) = self.exchange_refresh_token(&refresh_token).await?;
        self.session.update_tokens(token, rotated)
    }

    /// Make the session usable again after a 401 on a request sent with
    /// `sent_with`.
    async fn recover_session(&self, sent_with: Option<&str>) -> Result<(), ClientError> {
        let _guard = self.refresh_lock.lock().await;

        let Some(current) = self.session.current() else {
            if sent_with.is_some() {
                // Another request already failed to refresh and expired the session.
                return Err(ClientError::SessionExpired);
            }
            return Err(self.expire("no refresh token"));
        };
        if sent_with != Some(current.token.as_str()) {
            debug!("Session refreshed by a concurrent request");
            return Ok(());
        }

        match self.exchange_refresh_token(&current.refresh_token).await {
            Ok((token, rotated)) => {
                self.session.update_tokens(token, rotated)?;
                info!(user_id = current.principal.id, "Session refreshed");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Token refresh failed");
                Err(self.expire("refresh failed"))
            }
        }
    }

    /// Clear the session, notify the user and schedule the login redirect.
    fn expire(&self, reason: &str) -> ClientError {
        warn!(reason, "Session expired");
        if let Err(e) = self.session.clear() {
            error!(error = %e, "Failed to clear expired session");
        }
        self.events.error(ClientError::SessionExpired.user_message());
        let _ = self.events.schedule_redirect(self.redirect_delay);
        ClientError::SessionExpired
    }

    /// Call the refresh endpoint directly, outside the retry loop.
    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<(String, Option<String>), ClientError> {
        let url = self.url(Service::Core, &self.refresh_path, &[])?;
        let response = self
            .http
            .post(url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;
        let response = ApiResponse::read(response).await?;
        if !response.status().is_success() {
            return Err(ClientError::Server {
                status: response.status().as_u16(),
                body: response.text(),
            });
        }
        let body: RefreshResponse = response
            .json()
            .map_err(|_| ClientError::RefreshResponseInvalid)?;
        match body.token {
            Some(token) if !token.is_empty() => Ok((token, body.refresh_token)),
            _ => Err(ClientError::RefreshResponseInvalid),
        }
    }

    async fn dispatch(
        &self,
        service: Service,
        request: &ApiRequest,
        token: Option<&str>,
    ) -> Result<ApiResponse, ClientError> {
        let url = self.url(service, &request.path, &request.query)?;
        let mut builder = self.http.request(request.method.clone(), url);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            Body::Empty => builder,
            Body::Json(value) => builder.json(value),
            Body::Multipart(upload) => builder.multipart(upload.to_form()?),
        };

        let response = builder.send().await.map_err(|e| {
            debug!(method = %request.method, path = %request.path, error = %e, "Request failed");
            ClientError::from(e)
        })?;
        let response = ApiResponse::read(response).await?;
        debug!(
            method = %request.method,
            path = %request.path,
            status = response.status().as_u16(),
            "Request completed"
        );
        Ok(response)
    }

    fn url(
        &self,
        service: Service,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Url, ClientError> {
        let base = match service {
            Service::Core => &self.api_base,
            Service::Forecast => &self.forecast_base,
        };
        let mut url = Url::parse(&format!("{base}{path}"))
            .map_err(|e| ClientError::Request(format!("invalid URL {base}{path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }
}
