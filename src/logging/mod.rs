// Logging setup
//
// Everything goes to stderr: stdout carries the piped data.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

/// Default directives per `-v` count. mDNS internals stay at `warn` unless
/// RUST_LOG asks otherwise.
pub fn default_directives(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info,mdns_sd=warn",
        2 => "debug,mdns_sd=warn",
        _ => "trace",
    }
}

/// Install the global tracing subscriber and route `log` records (emitted by
/// mdns-sd) through it. `RUST_LOG` overrides the verbosity flag.
pub fn init(verbosity: u8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;
    tracing_log::LogTracer::init().context("Failed to bridge log records into tracing")?;

    Ok(())
}
