//! Forecast subcommands: containers, data upload, forecasting, data quality.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};
use std::path::PathBuf;

use wilma_client::api::{ForecastDuration, ForecastModel, ForecastRequest};

use crate::context::Context;
use crate::output_fmt::{write_ack, write_cleaning_report, write_forecast};

/// Forecast subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum ForecastAction {
    /// List containers known to the forecasting service.
    Containers,
    /// Register a new container.
    AddContainer { name: String },
    /// Rename a container.
    RenameContainer { name: String, new_name: String },
    /// Delete a container and its data.
    DeleteContainer { name: String },
    /// Upload a CSV of measurements for a container.
    Upload {
        #[arg(short, long)]
        container: String,
        /// CSV file with `date` and `value` columns.
        file: PathBuf,
    },
    /// Print stored measurements.
    History {
        #[arg(short, long)]
        container: String,
    },
    /// Generate a forecast.
    Generate {
        #[arg(short, long)]
        container: String,
        /// Horizon: 1d, 7d, 30d or 90d.
        #[arg(short, long, default_value = "7d")]
        duration: ForecastDuration,
        /// Model name, e.g. `prophet` or `tensorflow`.
        #[arg(short, long, default_value = "prophet")]
        model: ForecastModel,
        /// Prophet only: also train on points flagged as anomalies.
        #[arg(long)]
        with_anomalies: bool,
    },
    /// Print forecast against actual values as JSON.
    Compare {
        #[arg(short, long)]
        container: String,
    },
    /// Detect and flag anomalies in stored data.
    Analyze {
        #[arg(short, long)]
        container: String,
    },
    /// Flag or unflag a single measurement as an anomaly.
    MarkAnomaly {
        #[arg(short, long)]
        container: String,
        #[arg(long)]
        date: String,
        /// Clear the flag instead of setting it.
        #[arg(long)]
        clear: bool,
    },
    /// Fill gaps in stored data.
    Clean {
        #[arg(short, long)]
        container: String,
    },
}

/// Execute a forecast subcommand.
pub async fn run(action: ForecastAction, ctx: &Context) -> anyhow::Result<()> {
    ctx.require_login()?;
    let api = ctx.forecast();
    let mut out = io::stdout();
    match action {
        ForecastAction::Containers => {
            let containers = api.containers().await?;
            if containers.is_empty() {
                writeln!(out, "No containers")?;
            }
            for name in containers {
                writeln!(out, "{name}")?;
            }
        }
        ForecastAction::AddContainer { name } => {
            let ack = api.add_container(&name).await?;
            write_ack(&mut out, &ack.message, "Container added")?;
        }
        ForecastAction::RenameContainer { name, new_name } => {
            let ack = api.rename_container(&name, &new_name).await?;
            write_ack(&mut out, &ack.message, "Container renamed")?;
        }
        ForecastAction::DeleteContainer { name } => {
            let ack = api.delete_container(&name).await?;
            write_ack(&mut out, &ack.message, "Container deleted")?;
        }
        ForecastAction::Upload { container, file } => {
            let file_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| anyhow::anyhow!("Not a file: {}", file.display()))?;
            let bytes = std::fs::read(&file)?;
            let ack = api.upload_data(&container, &file_name, bytes).await?;
            write_ack(&mut out, &ack.message, "Data uploaded")?;
        }
        ForecastAction::History { container } => {
            for point in api.historical_data(&container).await? {
                let value = point
                    .actual
                    .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
                let flag = if point.is_anomaly { "  anomaly" } else { "" };
                writeln!(out, "  {}  {value}{flag}", point.date)?;
            }
        }
        ForecastAction::Generate {
            container,
            duration,
            model,
            with_anomalies,
        } => {
            let request = ForecastRequest {
                container_id: container,
                duration,
                model,
                prophet_train_with_anomalies: with_anomalies,
            };
            let response = api.generate_forecast(&request).await?;
            write_forecast(&mut out, &response)?;
        }
        ForecastAction::Compare { container } => {
            let comparison = api.forecast_vs_actual(&container).await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&comparison)?)?;
        }
        ForecastAction::Analyze { container } => {
            let report = api.analyze_anomalies(&container).await?;
            writeln!(out, "{}", report.message)?;
            writeln!(out, "  Marked:   {}", report.anomalies_marked_count)?;
            for sample in &report.anomaly_sample {
                let value = sample
                    .value
                    .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
                writeln!(out, "  {}  {value}", sample.date)?;
            }
        }
        ForecastAction::MarkAnomaly {
            container,
            date,
            clear,
        } => {
            let ack = api.set_anomaly(&container, &date, !clear).await?;
            write_ack(&mut out, &ack.message, "Data point updated")?;
        }
        ForecastAction::Clean { container } => {
            let report = api.clean_data(&container).await?;
            writeln!(out, "{}", report.message)?;
            write_cleaning_report(&mut out, &report)?;
        }
    }
    Ok(())
}
