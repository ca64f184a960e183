//! Correlation error types.

use crate::envelope::ChainId;
use thiserror::Error;

/// Ways a pending reply can fail to resolve.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CorrelationError {
    /// No reply arrived before the deadline.
    #[error("request {request_id} timed out after {timeout_ms} ms")]
    Timeout {
        /// Chain identifier of the expired request.
        request_id: ChainId,
        /// Configured timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The peer answered with an `error` envelope.
    #[error("{message}")]
    Rejected {
        /// Chain identifier of the failed request.
        request_id: ChainId,
        /// Error text carried by the reply.
        message: String,
    },

    /// The owning runtime stopped before a reply arrived.
    #[error("request {request_id} was cancelled")]
    Cancelled {
        /// Chain identifier of the cancelled request.
        request_id: ChainId,
    },

    /// The request could not be sent because the outbound channel is gone.
    #[error("request {request_id} could not be sent: channel unavailable")]
    Disconnected {
        /// Chain identifier of the unsent request.
        request_id: ChainId,
    },

    /// No unique child identifier could be derived from the base chain.
    #[error("could not allocate a unique request id below {base}")]
    Collision {
        /// Chain the child identifier was derived from.
        base: ChainId,
    },
}

impl CorrelationError {
    /// Returns whether the failure was a deadline expiry.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns the request identifier the failure relates to.
    #[must_use]
    pub const fn request_id(&self) -> &ChainId {
        match self {
            Self::Timeout { request_id, .. }
            | Self::Rejected { request_id, .. }
            | Self::Cancelled { request_id }
            | Self::Disconnected { request_id } => request_id,
            Self::Collision { base } => base,
        }
    }
}
