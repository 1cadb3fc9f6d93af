//! Auth subcommands: login, logout, status, refresh.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use crate::context::Context;
use crate::output_fmt::write_principal;

/// Auth subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum AuthAction {
    /// Log in with email and password.
    Login {
        /// Account email.
        #[arg(short, long)]
        email: String,
        /// Password.
        #[arg(short, long, env = "WILMA_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out and drop the stored session.
    Logout,
    /// Show current auth status.
    Status,
    /// Exchange the refresh token for a new access token.
    Refresh,
}

/// Execute an auth subcommand.
pub async fn run(action: AuthAction, ctx: &Context) -> anyhow::Result<()> {
    match action {
        AuthAction::Login { email, password } => login(ctx, &email, &password).await,
        AuthAction::Logout => logout(ctx).await,
        AuthAction::Status => status(ctx),
        AuthAction::Refresh => refresh(ctx).await,
    }
}

async fn login(ctx: &Context, email: &str, password: &str) -> anyhow::Result<()> {
    let session = ctx
        .gateway
        .login(email, password)
        .await
        .map_err(|e| anyhow::anyhow!("Login failed: {}", e.user_message()))?;
    let mut out = io::stdout();
    writeln!(out, "Logged in as {}", session.principal.username)?;
    Ok(())
}

async fn logout(ctx: &Context) -> anyhow::Result<()> {
    ctx.gateway.logout().await?;
    let mut out = io::stdout();
    writeln!(out, "Logged out")?;
    Ok(())
}

fn status(ctx: &Context) -> anyhow::Result<()> {
    let mut out = io::stdout();
    match ctx.gateway.session().principal() {
        Some(principal) => {
            writeln!(out, "Logged in")?;
            write_principal(&mut out, &principal)?;
            writeln!(out, "  API:      {}", ctx.settings.api.base_url)?;
        }
        None => writeln!(out, "Not logged in")?,
    }
    Ok(())
}

async fn refresh(ctx: &Context) -> anyhow::Result<()> {
    ctx.require_login()?;
    ctx.gateway
        .refresh_session()
        .await
        .map_err(|e| anyhow::anyhow!("Refresh failed: {}", e.user_message()))?;
    let mut out = io::stdout();
    writeln!(out, "Session refreshed")?;
    Ok(())
}
