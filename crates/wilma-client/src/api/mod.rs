//! Typed surfaces over the backend REST APIs.
//!
//! Every call goes through the [`Gateway`](crate::gateway::Gateway), so all
//! of them share its credential handling and error mapping.

mod forecast;
mod logs;
mod polls;
mod users;


use serde::Deserialize;

pub use forecast::{
    AnalysisReport, AnomalySample, CleaningReport, ForecastApi, ForecastDuration, ForecastModel,
    ForecastPoint, ForecastRequest, ForecastResponse, HistoricalPoint,
};
pub use logs::{LogEntry, LogFilter, LogsApi, distinct_users};
pub use polls::PollsApi;
pub use users::{NewUser, ProfileUpdate, UserSummary, UsersApi};

/// `{"message": ...}` acknowledgement body returned by most mutations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Acknowledgement {
    #[serde(default)]
    pub message: String,
}

impl Acknowledgement {
    /// Decode an acknowledgement, tolerating empty bodies (204 No Content).
    pub(crate) fn from_response(
        response: &crate::gateway::ApiResponse,
    ) -> Result<Self, crate::ClientError> {
        if response.bytes().is_empty() {
            return Ok(Self::default());
        }
        response.json()
    }
}
