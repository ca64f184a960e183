//! Worker error types.

use crate::correlation::CorrelationError;
use crate::envelope::EnvelopeError;
use thiserror::Error;

/// Result type for worker handlers.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors a worker handler may return.
///
/// The runtime converts every variant into an `error` envelope carrying the
/// display text and the triggering request id.
#[derive(Debug, Clone, Error)]
pub enum WorkerError {
    /// The envelope payload does not have the shape the handler expects.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A configuration value is missing or malformed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Domain processing failed.
    #[error("{0}")]
    Failed(String),

    /// A correlated sub-request failed.
    #[error(transparent)]
    Correlation(#[from] CorrelationError),

    /// Envelope validation failed.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
}

impl WorkerError {
    /// Creates a [`WorkerError::Failed`] from a message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
