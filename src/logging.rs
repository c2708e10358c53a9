//! Diagnostic tracing for the `awc` binary.
//!
//! Reads the `AWC_LOG` env var (same syntax as `RUST_LOG`). When unset the
//! level follows `-v`: `warn`, then `debug`, then `trace`. Output goes to
//! stderr so generated YAML on stdout stays clean.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "AWC_LOG";

/// Default filter for a `-v` count.
pub fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "awc=debug",
        _ => "awc=trace",
    }
}

pub fn init(verbose: u8) {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
