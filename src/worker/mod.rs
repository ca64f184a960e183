//! Worker contract and the runtime shared by every worker.
//!
//! A worker supplies domain logic through the [`Worker`] trait. The
//! [`WorkerRuntime`] owns the worker's end of its channel and provides the
//! uniform behaviour around it:
//!
//! - `set-config` / `get-config` handling against a shared [`WorkerConfig`]
//! - settling correlated replies before domain dispatch
//! - turning unhandled types and handler failures into `error` envelopes
//! - stamping every outbound envelope with the worker identity

mod config;
mod context;
mod contract;
mod error;
mod runtime;

pub use config::WorkerConfig;
pub use context::{Outbox, WorkerContext};
pub use contract::{Reply, Worker};
pub use error::{WorkerError, WorkerResult};
pub use runtime::WorkerRuntime;

#[cfg(test)]
mod tests;
