//! Client error taxonomy.

use thiserror::Error;

/// Fallback shown when the backend gives no usable message.
const GENERIC_MESSAGE: &str = "An unexpected error occurred.";

/// Errors surfaced by the gateway and the features built on it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client-side precondition failure; nothing was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No usable refresh credential, or the refresh call failed.
    #[error("Session expired")]
    SessionExpired,

    /// The refresh endpoint answered without a new access credential.
    #[error("Refresh response did not contain an access token")]
    RefreshResponseInvalid,

    /// Non-401 HTTP error response (or a 401 after the single retry).
    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    /// No response was received at all.
    #[error("Network error or server unreachable: {0}")]
    NetworkUnreachable(String),

    /// A successful response had an unexpected body.
    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// The request could not be built (bad URL, header, upload).
    #[error("Invalid request: {0}")]
    Request(String),

    /// Session persistence failed.
    #[error(transparent)]
    Storage(#[from] wilma_core::Error),
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub const fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// HTTP status carried by a server error.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message suitable for a user-facing notification.
    ///
    /// Server errors prefer the backend's `message` (ASP.NET) or `detail`
    /// (FastAPI) field.
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { body, .. } => backend_message(body)
                .unwrap_or_else(|| GENERIC_MESSAGE.to_string()),
            Self::SessionExpired => "Session expired.".to_string(),
            Self::NetworkUnreachable(_) => "Network error or server unreachable.".to_string(),
            Self::Validation(msg) => msg.clone(),
            _ => GENERIC_MESSAGE.to_string(),
        }
    }
}

fn backend_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "detail", "title"]
        .iter()
        .find_map(|key| value.get(key).and_then(serde_json::Value::as_str))
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else if e.is_builder() {
            Self::Request(e.to_string())
        } else {
            Self::NetworkUnreachable(e.to_string())
        }
    }
}
