//! Forecasting service endpoints.
//!
//! Served from a separate base URL. Requests carry the session's bearer
//! token but a 401 is reported as-is, without a refresh.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::Acknowledgement;
use crate::error::ClientError;
use crate::gateway::{ApiRequest, Gateway, Service, Upload};

/// Forecasting model. Names other than the built-in ones are passed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub enum ForecastModel {
    Prophet,
    Tensorflow,
    Other(String),
}

impl ForecastModel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Prophet => "prophet",
            Self::Tensorflow => "tensorflow",
            Self::Other(name) => name,
        }
    }
}

impl From<ForecastModel> for String {
    fn from(model: ForecastModel) -> Self {
        model.as_str().to_string()
    }
}

impl FromStr for ForecastModel {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(ClientError::validation("A forecast model is required.")),
            "prophet" => Ok(Self::Prophet),
            "tensorflow" => Ok(Self::Tensorflow),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}

impl fmt::Display for ForecastModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forecast horizon accepted by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForecastDuration {
    #[serde(rename = "1d")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl ForecastDuration {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "1d",
            Self::Week => "7d",
            Self::Month => "30d",
            Self::Quarter => "90d",
        }
    }

    pub const fn days(self) -> u32 {
        match self {
            Self::Day => 1,
            Self::Week => 7,
            Self::Month => 30,
            Self::Quarter => 90,
        }
    }
}

impl FromStr for ForecastDuration {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1d" => Ok(Self::Day),
            "7d" => Ok(Self::Week),
            "30d" => Ok(Self::Month),
            "90d" => Ok(Self::Quarter),
            other => Err(ClientError::validation(format!(
                "Unsupported forecast duration '{other}' (expected 1d, 7d, 30d or 90d)."
            ))),
        }
    }
}

impl fmt::Display for ForecastDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastRequest {
    #[serde(rename = "containerId")]
    pub container_id: String,
    pub duration: ForecastDuration,
    pub model: ForecastModel,
    /// Prophet only: train on data points flagged as anomalies too.
    pub prophet_train_with_anomalies: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: String,
    pub forecast: Option<f64>,
    #[serde(default)]
    pub yhat_lower: Option<f64>,
    #[serde(default)]
    pub yhat_upper: Option<f64>,
    #[serde(default)]
    pub trend: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub forecast_data: Vec<ForecastPoint>,
    #[serde(default)]
    pub message: String,
    /// Free-form training diagnostics from the model.
    #[serde(default)]
    pub model_training_report: Option<serde_json::Value>,
}

/// One stored measurement of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub date: String,
    pub actual: Option<f64>,
    #[serde(default)]
    pub is_anomaly: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnomalySample {
    pub date: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisReport {
    pub message: String,
    pub container_id: String,
    pub anomalies_marked_count: u64,
    #[serde(default)]
    pub anomaly_sample: Vec<AnomalySample>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CleaningReport {
    pub message: String,
    pub container_id: String,
    pub values_imputed: u64,
    pub db_rows_updated: u64,
    pub nans_before: u64,
    pub nans_after: u64,
    /// Present when some gaps could not be filled.
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ForecastApi {
    gateway: Arc<Gateway>,
}

impl ForecastApi {
    pub const fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn containers(&self) -> Result<Vec<String>, ClientError> {
        self.gateway
            .send_json(Service::Forecast, ApiRequest::get("/containers"))
            .await
    }

    pub async fn add_container(&self, name: &str) -> Result<Acknowledgement, ClientError> {
        let name = non_empty(name, "Container name")?;
        let request = ApiRequest::post("/containers").json(&serde_json::json!({ "name": name }))?;
        let ack = self.send(request).await?;
        info!(container = name, "Container added");
        Ok(ack)
    }

    pub async fn rename_container(
        &self,
        old_name: &str,
        new_name: &str,
    ) -> Result<Acknowledgement, ClientError> {
        let new_name = non_empty(new_name, "New container name")?;
        let request = ApiRequest::put(format!("/containers/{}", container_segment(old_name)))
            .json(&serde_json::json!({ "new_name": new_name }))?;
        self.send(request).await
    }

    pub async fn delete_container(&self, name: &str) -> Result<Acknowledgement, ClientError> {
        self.send(ApiRequest::delete(format!("/containers/{}", container_segment(name))))
            .await
    }

    /// Upload a CSV of measurements (`date`/`value` columns) for `container_id`.
    pub async fn upload_data(
        &self,
        container_id: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Acknowledgement, ClientError> {
        if !file_name.to_ascii_lowercase().ends_with(".csv") {
            return Err(ClientError::validation("Only .csv files can be uploaded."));
        }
        if bytes.is_empty() {
            return Err(ClientError::validation("The file is empty."));
        }
        let upload = Upload::file("file", file_name, bytes)
            .with_mime("text/csv")
            .with_text("container_id", container_id);
        self.send(ApiRequest::post("/upload_data/").upload(upload))
            .await
    }

    pub async fn historical_data(&self, container_id: &str) -> Result<Vec<HistoricalPoint>, ClientError> {
        self.gateway
            .send_json(
                Service::Forecast,
                ApiRequest::get(format!("/historical_data/{}", container_segment(container_id))),
            )
            .await
    }

    pub async fn generate_forecast(
        &self,
        request: &ForecastRequest,
    ) -> Result<ForecastResponse, ClientError> {
        non_empty(&request.container_id, "Container")?;
        self.gateway
            .send_json(
                Service::Forecast,
                ApiRequest::post("/generate_forecast/").json(request)?,
            )
            .await
    }

    /// Raw comparison payload; the service does not fix its shape.
    pub async fn forecast_vs_actual(&self, container_id: &str) -> Result<serde_json::Value, ClientError> {
        self.gateway
            .send_json(
                Service::Forecast,
                ApiRequest::get(format!("/forecast_vs_actual/{}", container_segment(container_id))),
            )
            .await
    }

    pub async fn analyze_anomalies(&self, container_id: &str) -> Result<AnalysisReport, ClientError> {
        self.gateway
            .send_json(
                Service::Forecast,
                ApiRequest::post(format!("/actuals/{}/analyze_and_mark_anomalies", container_segment(container_id))),
            )
            .await
    }

    /// Flag or unflag a single measurement as an anomaly.
    pub async fn set_anomaly(
        &self,
        container_id: &str,
        date: &str,
        is_anomaly: bool,
    ) -> Result<Acknowledgement, ClientError> {
        let request = ApiRequest::post(format!("/actuals/{}/update_anomaly_datapoint", container_segment(container_id)))
            .json(&serde_json::json!({ "date": date, "is_anomaly": is_anomaly }))?;
        self.send(request).await
    }

    pub async fn clean_data(&self, container_id: &str) -> Result<CleaningReport, ClientError> {
        self.gateway
            .send_json(
                Service::Forecast,
                ApiRequest::post(format!("/actuals/{}/clean_data", container_segment(container_id))),
            )
            .await
    }

    async fn send(&self, request: ApiRequest) -> Result<Acknowledgement, ClientError> {
        let response = self.gateway.send_to(Service::Forecast, request).await?;
        Acknowledgement::from_response(&response)
    }
}

/// Container ids may contain `/` and are sent as path text. Characters that
/// would end the path or start an escape are percent-encoded.
fn container_segment(id: &str) -> String {
    let mut segment = String::with_capacity(id.len());
    for c in id.chars() {
        match c {
            '%' => segment.push_str("%25"),
            '?' => segment.push_str("%3F"),
            '#' => segment.push_str("%23"),
            _ => segment.push(c),
        }
    }
    segment
}

fn non_empty<'a>(value: &'a str, what: &str) -> Result<&'a str, ClientError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ClientError::validation(format!("{what} must not be empty.")));
    }
    Ok(value)
}
