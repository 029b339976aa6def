//! Diagnostic logging setup.
//!
//! Logs go to stderr so the transcript printed on stdout stays clean.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "NC_CHAT_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Installs the global fmt subscriber. Returns `false` if one was already set.
pub fn init_logging() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
