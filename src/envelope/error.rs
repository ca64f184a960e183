//! Error types for envelope parsing and payload validation.

use super::{ChainId, EnvelopeKind};
use thiserror::Error;

/// Errors returned while constructing or validating envelope values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    /// The worker name is empty after trimming.
    #[error("worker name must not be empty")]
    EmptyWorkerName,

    /// The worker name contains characters outside `[A-Za-z0-9_.-]`.
    #[error(
        "worker name '{0}' contains invalid characters (only alphanumeric, '_', '-' and '.' allowed)"
    )]
    InvalidWorkerName(String),

    /// The worker name exceeds the 100-character limit.
    #[error("worker name exceeds 100 character limit: {0}")]
    WorkerNameTooLong(String),

    /// A chain identifier segment is empty or contains the `:` separator.
    #[error("invalid chain identifier segment '{0}'")]
    InvalidChainSegment(String),

    /// The envelope type requires a payload but none was supplied.
    #[error("'{0}' envelope requires a payload")]
    MissingPayload(EnvelopeKind),

    /// The payload is not a valid chat turn.
    #[error("invalid chat turn: {0}")]
    InvalidChatTurn(String),

    /// The payload is not a valid forward instruction.
    #[error("invalid forward instruction: {0}")]
    InvalidForward(String),

    /// A request identifier is required but absent.
    #[error("{0} request id is missing")]
    MissingRequestId(&'static str),

    /// The outer and inner request identifiers of a forward differ.
    #[error("forward request id '{outer}' does not match inner request id '{inner}'")]
    RequestIdMismatch {
        /// Request identifier on the outer `forward` envelope.
        outer: ChainId,
        /// Request identifier on the embedded envelope.
        inner: ChainId,
    },

    /// The envelope could not be decoded from or encoded to JSON.
    #[error("malformed envelope: {0}")]
    Malformed(String),
}

impl EnvelopeError {
    /// Wraps a JSON codec failure.
    pub fn malformed(err: &serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
