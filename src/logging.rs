//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Results go to stdout; log events go to stderr so they never mix with the
//! report. `RUST_LOG` takes precedence over the `-v` count.

use tracing_subscriber::EnvFilter;

/// Log level for a `-v` count: warn by default, then info, debug and trace
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(verbosity: u8) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("basketforge={}", level_for_verbosity(verbosity))));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("Failed to initialise logging: {err}"))
}
