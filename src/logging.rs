// Tracing setup: one fmt layer on stderr, filtered by RUST_LOG or by the
// `-v` count when RUST_LOG is unset.

use std::io;

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid logging filter: {0}")]
    Filter(#[from] ParseError),
    #[error("failed to install logging subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Default directive for a `-v` count. `RUST_LOG` takes precedence.
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "falgen_cli=info,warn",
        _ => "falgen_cli=debug,info",
    }
}

fn build_filter(verbosity: u8) -> Result<EnvFilter, ParseError> {
    match std::env::var("RUST_LOG") {
        Ok(spec) if !spec.trim().is_empty() => EnvFilter::try_new(spec),
        _ => EnvFilter::try_new(default_directive(verbosity)),
    }
}

/// Install the stderr subscriber. Call once, before any other output.
pub fn init_logging(verbosity: u8) -> Result<(), LoggingError> {
    let filter = build_filter(verbosity)?;
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_ansi(false);
    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;
    Ok(())
}
