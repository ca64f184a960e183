//! Transport error types.

use std::sync::Arc;
use thiserror::Error;

/// Errors raised while moving envelopes across a channel.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The peer end of the channel has been dropped.
    #[error("channel closed")]
    Closed,

    /// The underlying byte stream failed.
    #[error("stream I/O failed: {0}")]
    Io(Arc<std::io::Error>),

    /// An envelope could not be encoded for the wire.
    #[error("envelope encoding failed: {0}")]
    Codec(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
