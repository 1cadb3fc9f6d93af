//! User management and profile endpoints (`/api/users`).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::Acknowledgement;
use crate::error::ClientError;
use crate::gateway::{ApiRequest, Gateway, Service, Upload};

/// Row of the admin user listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: String,
    /// Only reported by the status listing.
    #[serde(default)]
    pub is_online: Option<bool>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

/// Account to create. The creating admin's email is filled in from the
/// session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

/// Editable profile fields of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub phone_number: String,
    pub location: String,
    pub profile_image_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    #[serde(flatten)]
    user: &'a NewUser,
    admin_email: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileBody<'a> {
    username: &'a str,
    email: &'a str,
    phone_number: &'a str,
    location: &'a str,
    profile_image_url: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OnlineCount {
    online_users: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageUploaded {
    image_url: String,
}

#[derive(Debug, Clone)]
pub struct UsersApi {
    gateway: Arc<Gateway>,
}

impl UsersApi {
    pub const fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// All accounts with profile image (`GET /api/users/all`).
    pub async fn list_all(&self) -> Result<Vec<UserSummary>, ClientError> {
        self.gateway
            .send_json(Service::Core, ApiRequest::get("/api/users/all"))
            .await
    }

    /// All accounts with online status (`GET /api/users`).
    pub async fn list_with_status(&self) -> Result<Vec<UserSummary>, ClientError> {
        self.gateway
            .send_json(Service::Core, ApiRequest::get("/api/users"))
            .await
    }

    pub async fn register(&self, user: &NewUser) -> Result<Acknowledgement, ClientError> {
        let admin = self
            .gateway
            .session()
            .principal()
            .ok_or_else(|| ClientError::validation("Not signed in."))?;
        let body = RegisterBody {
            user,
            admin_email: &admin.email,
        };
        let response = self
            .gateway
            .send(ApiRequest::post("/api/users/register").json(&body)?)
            .await?;
        info!(username = %user.username, role = %user.role, "User registered");
        Acknowledgement::from_response(&response)
    }

    pub async fn delete(&self, user_id: i64) -> Result<Acknowledgement, ClientError> {
        let response = self
            .gateway
            .send(ApiRequest::delete(format!("/api/users/{user_id}")))
            .await?;
        info!(user_id, "User deleted");
        Acknowledgement::from_response(&response)
    }

    /// Save profile fields and mirror them into the stored principal.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<Acknowledgement, ClientError> {
        let principal = self
            .gateway
            .session()
            .principal()
            .ok_or_else(|| ClientError::validation("Not signed in."))?;
        let body = ProfileBody {
            username: &principal.username,
            email: &principal.email,
            phone_number: &update.phone_number,
            location: &update.location,
            profile_image_url: &update.profile_image_url,
        };
        let response = self
            .gateway
            .send(ApiRequest::put("/api/users/update-profile").json(&body)?)
            .await?;
        self.gateway.session().update_principal(|p| {
            p.phone_number = Some(update.phone_number.clone());
            p.location = Some(update.location.clone());
            p.profile_image_url = Some(update.profile_image_url.clone());
        })?;
        Acknowledgement::from_response(&response)
    }

    /// Upload a profile picture; returns the URL the server stored it under.
    pub async fn upload_profile_image(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        mime: Option<&str>,
    ) -> Result<String, ClientError> {
        let mut upload = Upload::file("file", file_name, bytes);
        if let Some(mime) = mime {
            upload = upload.with_mime(mime);
        }
        let uploaded: ImageUploaded = self
            .gateway
            .send_json(
                Service::Core,
                ApiRequest::post("/api/users/upload-profile-image").upload(upload),
            )
            .await?;
        Ok(uploaded.image_url)
    }

    pub async fn forgot_password(&self, email: &str) -> Result<Acknowledgement, ClientError> {
        let response = self
            .gateway
            .send(
                ApiRequest::post("/api/users/forgot-password")
                    .json(&serde_json::json!({ "email": email }))?,
            )
            .await?;
        Acknowledgement::from_response(&response)
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<Acknowledgement, ClientError> {
        let response = self
            .gateway
            .send(
                ApiRequest::post("/api/users/reset-password")
                    .json(&serde_json::json!({ "token": token, "newPassword": new_password }))?,
            )
            .await?;
        Acknowledgement::from_response(&response)
    }

    pub async fn online_count(&self) -> Result<u32, ClientError> {
        let count: OnlineCount = self
            .gateway
            .send_json(Service::Core, ApiRequest::get("/api/users/online-count"))
            .await?;
        Ok(count.online_users)
    }
}
