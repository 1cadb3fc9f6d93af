//! Audit log subcommands.
//!
//! User-facing output uses writeln! to stdout (this is a CLI binary, not debug output).

use std::io::{self, Write};

use wilma_client::api::{LogFilter, distinct_users};

use crate::context::Context;
use crate::output_fmt::write_log_row;

/// Log subcommand actions.
#[derive(clap::Subcommand, Debug)]
pub enum LogAction {
    /// List log entries, newest first.
    List {
        /// Level filter (`Info`, `Warning`, `Error`, or `all`).
        #[arg(short, long)]
        level: Option<String>,
        /// Only entries by this user.
        #[arg(short, long)]
        user: Option<String>,
        /// Inclusive start day (YYYY-MM-DD).
        #[arg(long)]
        since: Option<String>,
        /// Inclusive end day (YYYY-MM-DD).
        #[arg(long)]
        until: Option<String>,
    },
    /// List the users that appear in the log.
    Users,
    /// Delete one entry.
    Delete {
        /// Entry ID.
        id: i64,
    },
}

/// Execute a log subcommand.
pub async fn run(action: LogAction, ctx: &Context) -> anyhow::Result<()> {
    ctx.require_login()?;
    let logs = ctx.logs();
    let mut out = io::stdout();
    match action {
        LogAction::List {
            level,
            user,
            since,
            until,
        } => {
            let filter = LogFilter {
                level,
                user,
                start_date: since,
                end_date: until,
            };
            let entries = logs.list(&filter).await?;
            if entries.is_empty() {
                writeln!(out, "No log entries")?;
            }
            for entry in &entries {
                write_log_row(&mut out, entry)?;
            }
        }
        LogAction::Users => {
            let entries = logs.list(&LogFilter::default()).await?;
            for user in distinct_users(&entries) {
                writeln!(out, "{user}")?;
            }
        }
        LogAction::Delete { id } => {
            logs.delete(id).await?;
            writeln!(out, "Deleted log entry {id}")?;
        }
    }
    Ok(())
}
