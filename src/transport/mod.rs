//! Channel transport between courier participants.
//!
//! Every participant owns one end of a duplex channel of [`Envelope`]
//! values. [`duplex`] creates an in-process pair; [`spawn_json_lines`]
//! bridges an endpoint onto any byte stream using newline-delimited JSON so
//! workers can live behind a socket or pipe.
//!
//! [`Envelope`]: crate::envelope::Envelope

mod channel;
mod error;
mod stream;

pub use channel::{Endpoint, EnvelopeReceiver, EnvelopeSender, duplex};
pub use error::TransportError;
pub use stream::spawn_json_lines;

#[cfg(test)]
mod tests;
