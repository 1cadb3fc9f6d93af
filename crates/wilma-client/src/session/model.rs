//! Session and principal types.
//!
//! The serialized form matches the object the backend returns from login,
//! so a login response deserializes straight into a [`Session`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Role name that grants administrative actions.
pub const ADMIN_ROLE: &str = "Admin";

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
}

/// Credential pair plus the principal it belongs to.
///
/// A session is only meaningful with both credentials present; see
/// [`Session::is_complete`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(flatten)]
    pub principal: Principal,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub refresh_token: String,
}

impl Session {
    pub fn new(principal: Principal, token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            principal,
            token: token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    /// Both credentials are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.token.is_empty() && !self.refresh_token.is_empty()
    }

    pub fn is_admin(&self) -> bool {
        self.principal.role == ADMIN_ROLE
    }

    /// Copy with a new access token and, when given, a new refresh token.
    pub fn with_tokens(&self, token: String, refresh_token: Option<String>) -> Self {
        Self {
            principal: self.principal.clone(),
            token,
            refresh_token: refresh_token.unwrap_or_else(|| self.refresh_token.clone()),
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("principal", &self.principal)
            .field("token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// Body sent to the refresh endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Body returned by the refresh endpoint. Both fields are checked by the
/// gateway; a missing `token` makes the response invalid.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Body sent to the login endpoint.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}
