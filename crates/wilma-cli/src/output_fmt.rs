//! Output formatting helpers shared by the subcommands.

use std::io::{self, Write};

use wilma_client::api::{CleaningReport, ForecastResponse, LogEntry, UserSummary};
use wilma_client::polls::Poll;
use wilma_client::Principal;

pub fn write_poll_detail(w: &mut impl Write, poll: &Poll) -> io::Result<()> {
    writeln!(w, "  Poll:     #{} {}", poll.id, poll.title)?;
    if let Some(desc) = poll.description.as_deref().filter(|d| !d.is_empty()) {
        writeln!(w, "  About:    {desc}")?;
    }
    if !poll.created_by.is_empty() {
        writeln!(w, "  By:       {}", poll.created_by)?;
    }
    writeln!(w, "  Votes:    {}", poll.total_votes)?;
    for option in &poll.options {
        let marker = if poll.user_vote_option_id == Some(option.id) {
            '*'
        } else {
            ' '
        };
        writeln!(
            w,
            "   {marker} [{}] {:<24} {:>4} ({:>3}%)",
            option.id,
            option.text,
            option.votes,
            percent(option.votes, poll.total_votes)
        )?;
    }
    Ok(())
}

/// Share of `votes` in `total`, rounded, 0 when nobody voted.
pub fn percent(votes: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let scaled = u64::from(votes) * 100 + u64::from(total) / 2;
    u32::try_from(scaled / u64::from(total)).unwrap_or(100)
}

pub fn write_principal(w: &mut impl Write, principal: &Principal) -> io::Result<()> {
    writeln!(w, "  User:     {} (#{})", principal.username, principal.id)?;
    writeln!(w, "  Email:    {}", principal.email)?;
    writeln!(w, "  Role:     {}", principal.role)?;
    if let Some(location) = principal.location.as_deref().filter(|l| !l.is_empty()) {
        writeln!(w, "  Location: {location}")?;
    }
    Ok(())
}

pub fn write_user_row(w: &mut impl Write, user: &UserSummary) -> io::Result<()> {
    let status = match user.is_online {
        Some(true) => "online",
        Some(false) => "offline",
        None => "-",
    };
    writeln!(
        w,
        "{:>5}  {:<20} {:<32} {:<8} {status}",
        user.id, user.username, user.email, user.role
    )
}

pub fn write_log_row(w: &mut impl Write, entry: &LogEntry) -> io::Result<()> {
    writeln!(
        w,
        "{}  {:<7} {:<16} {}",
        entry.timestamp, entry.level, entry.user, entry.message
    )
}

pub fn write_forecast(w: &mut impl Write, response: &ForecastResponse) -> io::Result<()> {
    if !response.message.is_empty() {
        writeln!(w, "{}", response.message)?;
    }
    for point in &response.forecast_data {
        let value = point
            .forecast
            .map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
        match (point.yhat_lower, point.yhat_upper) {
            (Some(lo), Some(hi)) => writeln!(w, "  {}  {value}  [{lo:.2}, {hi:.2}]", point.date)?,
            _ => writeln!(w, "  {}  {value}", point.date)?,
        }
    }
    Ok(())
}

pub fn write_cleaning_report(w: &mut impl Write, report: &CleaningReport) -> io::Result<()> {
    writeln!(w, "  Container: {}", report.container_id)?;
    writeln!(w, "  Imputed:   {}", report.values_imputed)?;
    writeln!(w, "  Updated:   {}", report.db_rows_updated)?;
    writeln!(w, "  Gaps:      {} -> {}", report.nans_before, report.nans_after)?;
    if let Some(detail) = &report.detail {
        writeln!(w, "  Note:      {detail}")?;
    }
    Ok(())
}

/// Print the server's acknowledgement, or `fallback` when it sent none.
pub fn write_ack(w: &mut impl Write, message: &str, fallback: &str) -> io::Result<()> {
    if message.is_empty() {
        writeln!(w, "{fallback}")
    } else {
        writeln!(w, "{message}")
    }
}
