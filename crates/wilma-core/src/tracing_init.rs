//! Log subscriber setup for the `wilma` binary.
//!
//! Command results are printed to stdout and are meant to be piped, so log
//! lines always go to stderr.

use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// `RUST_LOG` when set, `fallback` otherwise.
fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
}

/// Install the global subscriber writing to stderr, as JSON lines when
/// `log_json` is set.
pub fn init_tracing(default_filter: &str, log_json: bool) {
    install(env_filter(default_filter), log_json, std::io::stderr);
}

fn install<W>(filter: EnvFilter, log_json: bool, writer: W)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let registry = tracing_subscriber::registry().with(filter);
    let fmt = tracing_subscriber::fmt::layer().with_writer(writer);
    if log_json {
        registry.with(fmt.json()).init();
    } else {
        registry.with(fmt).init();
    }
}
