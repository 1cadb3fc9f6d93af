//! WILMA CLI
//!
//! Operator client for the WILMA backend and forecasting service.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, info};

use wilma_cli::auth_cmd::{self, AuthAction};
use wilma_cli::context::{Context, Overrides};
use wilma_cli::forecast_cmd::{self, ForecastAction};
use wilma_cli::log_cmd::{self, LogAction};
use wilma_cli::poll_cmd::{self, PollAction};
use wilma_cli::user_cmd::{self, UserAction};

#[derive(Debug, Parser)]
#[command(name = "wilma", version, about = "WILMA operator client")]
struct Cli {
    /// Main API base URL
    #[arg(long, global = true, env = "WILMA_API_URL")]
    api_url: Option<String>,

    /// Forecasting service base URL
    #[arg(long, global = true, env = "WILMA_FORECAST_URL")]
    forecast_url: Option<String>,

    /// Session storage file
    #[arg(long, global = true, env = "WILMA_STORAGE_PATH")]
    storage: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Sign in and out
    #[command(subcommand)]
    Auth(AuthAction),
    /// List, vote on, create and delete polls
    #[command(subcommand)]
    Poll(PollAction),
    /// Manage users
    #[command(subcommand)]
    User(UserAction),
    /// Browse the audit log
    #[command(subcommand)]
    Log(LogAction),
    /// Forecasting service
    #[command(subcommand)]
    Forecast(ForecastAction),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    wilma_core::tracing_init::init_tracing("wilma=warn", cli.json_logs);
    info!(version = env!("CARGO_PKG_VERSION"), "Starting wilma CLI");

    let mut settings = wilma_core::config::load_settings()?;
    Overrides {
        api_url: cli.api_url,
        forecast_url: cli.forecast_url,
        storage: cli.storage,
    }
    .apply(&mut settings);
    debug!(api = %settings.api.base_url, forecast = %settings.forecast.base_url, "Resolved settings");

    let ctx = Context::new(settings)?;
    let printer = ctx.spawn_event_printer();

    let result = match cli.command {
        Commands::Auth(action) => auth_cmd::run(action, &ctx).await,
        Commands::Poll(action) => poll_cmd::run(action, &ctx).await,
        Commands::User(action) => user_cmd::run(action, &ctx).await,
        Commands::Log(action) => log_cmd::run(action, &ctx).await,
        Commands::Forecast(action) => forecast_cmd::run(action, &ctx).await,
    };

    // Drop the gateway so the event bus closes and the printer drains.
    drop(ctx);
    let _ = printer.await;
    result
}
