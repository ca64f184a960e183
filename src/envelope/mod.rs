//! Envelope wire model shared by every courier participant.
//!
//! An [`Envelope`] is the unit of communication between the router, the
//! workers and the external caller. Its `type` tag is modelled by
//! [`EnvelopeKind`], the sender identity by [`WorkerName`] and the request
//! correlation chain by [`ChainId`]. The `:`-delimited chain string only
//! exists at the serde boundary; everything inside the crate works with the
//! structured segment list.
//!
//! Typed payload views ([`ChatTurn`], [`ContextBundle`], [`ForwardRequest`]) validate the
//! opaque JSON payload for the envelope types whose shape the core depends
//! on.

mod chain;
mod context;
mod error;
mod forward;
mod kind;
mod name;
mod turn;
mod wire;

pub use chain::{ChainId, ChainSegment};
pub use context::ContextBundle;
pub use error::EnvelopeError;
pub use forward::ForwardRequest;
pub use kind::EnvelopeKind;
pub use name::WorkerName;
pub use turn::{ChatTurn, Role};
pub use wire::Envelope;

#[cfg(test)]
mod tests;
