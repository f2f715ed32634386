//! Structured logging setup for the daemon.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! binary's job. Logs go to standard error so that standard output stays
//! free for command results.

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The filter directives did not parse.
    #[error("invalid log filter '{directives}': {source}")]
    InvalidFilter {
        /// Directives as supplied.
        directives: String,
        /// Parser failure.
        #[source]
        source: ParseError,
    },
    /// A global subscriber was already installed.
    #[error("failed to install log subscriber: {0}")]
    Install(String),
}

/// Builds the filter for `directives`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the directives are invalid.
pub fn filter(directives: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(directives).map_err(|source| TelemetryError::InvalidFilter {
        directives: directives.to_owned(),
        source,
    })
}

/// Installs a formatted subscriber filtered by `directives`.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or a subscriber is
/// already installed.
pub fn init(directives: &str) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(directives)?)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| TelemetryError::Install(err.to_string()))
}
