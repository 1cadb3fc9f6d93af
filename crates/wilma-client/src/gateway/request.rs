//! Request and response values passed through the gateway.
//!
//! Requests are plain owned data rather than `reqwest::RequestBuilder`s so
//! the gateway can rebuild and re-send the exact same call after a token
//! refresh.

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ClientError;

/// Backend a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Main REST API. 401 responses trigger a token refresh.
    Core,
    /// Forecasting service. Bearer token attached, no refresh handling.
    Forecast,
}

impl Service {
    pub const fn refreshes_on_unauthorized(self) -> bool {
        matches!(self, Self::Core)
    }
}

/// A file sent as `multipart/form-data`, with optional extra text fields.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Form field holding the file.
    pub field: String,
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
    pub text_fields: Vec<(String, String)>,
}

impl Upload {
    pub fn file(field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            mime: None,
            bytes,
            text_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    #[must_use]
    pub fn with_text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.text_fields.push((name.into(), value.into()));
        self
    }

    /// Build a fresh multipart form. Forms are consumed on send, so each
    /// attempt gets its own.
    pub(crate) fn to_form(&self) -> Result<reqwest::multipart::Form, ClientError> {
        let mut part = reqwest::multipart::Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone());
        if let Some(mime) = &self.mime {
            part = part
                .mime_str(mime)
                .map_err(|e| ClientError::Request(format!("invalid mime type {mime}: {e}")))?;
        }
        let mut form = reqwest::multipart::Form::new().part(self.field.clone(), part);
        for (name, value) in &self.text_fields {
            form = form.text(name.clone(), value.clone());
        }
        Ok(form)
    }
}

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Upload),
}

/// A rebuildable HTTP request, relative to a service base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Body,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ClientError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ClientError::Request(format!("unserializable body: {e}")))?;
        self.body = Body::Json(value);
        Ok(self)
    }

    #[must_use]
    pub fn upload(mut self, upload: Upload) -> Self {
        self.body = Body::Multipart(upload);
        self
    }

    #[must_use]
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }
}

/// One logical call through the gateway, carrying the one-shot retry guard.
#[derive(Debug)]
pub struct Attempt {
    pub request: ApiRequest,
    pub already_retried: bool,
}

impl Attempt {
    pub const fn new(request: ApiRequest) -> Self {
        Self {
            request,
            already_retried: false,
        }
    }

    /// Claim the single retry. Returns `false` if it was already used.
    pub const fn claim_retry(&mut self) -> bool {
        if self.already_retried {
            return false;
        }
        self.already_retried = true;
        true
    }
}

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    body: Vec<u8>,
}

impl ApiResponse {
    pub(crate) async fn read(response: reqwest::Response) -> Result<Self, ClientError> {
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(Self { status, body })
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }

    pub fn bytes(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ClientError::Decode(format!("{e} (status {}, {} bytes)", self.status, self.body.len()))
        })
    }
}
