//! WILMA CLI Library
//!
//! Subcommands of the `wilma` binary and the per-invocation client context.

pub mod auth_cmd;
pub mod context;
pub mod forecast_cmd;
pub mod log_cmd;
pub mod output_fmt;
pub mod poll_cmd;
pub mod user_cmd;
