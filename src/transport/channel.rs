//! In-process duplex channels.

use super::TransportError;
use crate::envelope::Envelope;
use tokio::sync::mpsc;

/// Cloneable sending half of a channel.
#[derive(Debug, Clone)]
pub struct EnvelopeSender {
    inner: mpsc::UnboundedSender<Envelope>,
}

impl EnvelopeSender {
    /// Queues an envelope for the peer.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] when the peer has gone away.
    pub fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.inner
            .send(envelope)
            .map_err(|_| TransportError::Closed)
    }

    /// Returns whether the peer has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Receiving half of a channel.
#[derive(Debug)]
pub struct EnvelopeReceiver {
    inner: mpsc::UnboundedReceiver<Envelope>,
}

impl EnvelopeReceiver {
    /// Waits for the next envelope; `None` once every sender is dropped.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.inner.recv().await
    }
}

/// One end of a duplex channel.
#[derive(Debug)]
pub struct Endpoint {
    sender: EnvelopeSender,
    receiver: EnvelopeReceiver,
}

impl Endpoint {
    /// Sends an envelope to the peer end.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Closed`] when the peer has gone away.
    pub fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.sender.send(envelope)
    }

    /// Waits for the next envelope from the peer end.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }

    /// Returns a cloneable sender to the peer end.
    #[must_use]
    pub fn sender(&self) -> EnvelopeSender {
        self.sender.clone()
    }

    /// Splits the endpoint into its sending and receiving halves.
    #[must_use]
    pub fn split(self) -> (EnvelopeSender, EnvelopeReceiver) {
        (self.sender, self.receiver)
    }
}

/// Creates a connected pair of endpoints.
///
/// Envelopes sent on one end are received, in order, on the other.
#[must_use]
pub fn duplex() -> (Endpoint, Endpoint) {
    let (left_tx, right_rx) = mpsc::unbounded_channel();
    let (right_tx, left_rx) = mpsc::unbounded_channel();
    (
        Endpoint {
            sender: EnvelopeSender { inner: left_tx },
            receiver: EnvelopeReceiver { inner: left_rx },
        },
        Endpoint {
            sender: EnvelopeSender { inner: right_tx },
            receiver: EnvelopeReceiver { inner: right_rx },
        },
    )
}
