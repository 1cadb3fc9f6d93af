//! Audit log endpoints (`/api/logs`).

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::gateway::{ApiRequest, Gateway, Service};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: i64,
    pub timestamp: String,
    pub level: String,
    pub user: String,
    pub message: String,
    #[serde(default)]
    pub details_json: Option<String>,
}

impl LogEntry {
    /// `details_json` parsed, if present and valid JSON.
    pub fn details(&self) -> Option<serde_json::Value> {
        self.details_json
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

/// Server-side log filter. Empty values and `"all"` mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub level: Option<String>,
    pub user: Option<String>,
    /// Inclusive start day, e.g. `2025-05-01`.
    pub start_date: Option<String>,
    /// Inclusive end day.
    pub end_date: Option<String>,
}

impl LogFilter {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("level", &self.level),
            ("user", &self.user),
            ("startDate", &self.start_date),
            ("endDate", &self.end_date),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            let value = value.as_deref()?.trim();
            (!value.is_empty() && !value.eq_ignore_ascii_case("all"))
                .then(|| (name, value.to_string()))
        })
        .collect()
    }
}

/// Distinct user names across `entries`, sorted.
pub fn distinct_users(entries: &[LogEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| e.user.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone)]
pub struct LogsApi {
    gateway: Arc<Gateway>,
}

impl LogsApi {
    pub const fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Entries matching `filter`, newest first.
    pub async fn list(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, ClientError> {
        let mut request = ApiRequest::get("/api/logs");
        for (name, value) in filter.query_pairs() {
            request = request.query(name, value);
        }
        self.gateway.send_json(Service::Core, request).await
    }

    pub async fn delete(&self, entry_id: i64) -> Result<(), ClientError> {
        self.gateway
            .send(ApiRequest::delete(format!("/api/logs/{entry_id}")))
            .await?;
        Ok(())
    }
}
