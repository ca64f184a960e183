//! Request correlation for components that issue sub-requests.
//!
//! A [`CorrelationMap`] hands out child chain identifiers and pairs each one
//! with a [`PendingReply`] continuation. The continuation settles exactly
//! once: by a matching `response`/`result`, a matching `error`, deadline
//! expiry, or cancellation when the owning runtime stops.

mod error;
mod map;
mod settings;

pub use error::CorrelationError;
pub use map::{CorrelationMap, PendingReply, PendingSummary, Settlement};
pub use settings::CorrelationSettings;

#[cfg(test)]
mod tests;
