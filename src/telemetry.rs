//! Tracing subscriber setup.

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Errors raised while installing the subscriber.
#[derive(Debug, Clone, Error)]
pub enum TelemetryError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter '{filter}': {reason}")]
    InvalidFilter {
        /// Directive that failed to parse.
        filter: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Builds the filter: `RUST_LOG` when set, `default_filter` otherwise.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] when the chosen directive is
/// malformed.
pub fn env_filter(default_filter: &str) -> Result<EnvFilter, TelemetryError> {
    let directive = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default_filter.to_owned());
    EnvFilter::try_new(&directive).map_err(|err| TelemetryError::InvalidFilter {
        filter: directive,
        reason: err.to_string(),
    })
}

/// Installs a global formatting subscriber writing to stderr.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is malformed or a subscriber
/// is already installed.
pub fn init_tracing(default_filter: &str) -> Result<(), TelemetryError> {
    let filter = env_filter(default_filter)?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInstalled(err.to_string()))
}
