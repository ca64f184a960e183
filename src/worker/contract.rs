//! The worker trait.

use super::{WorkerConfig, WorkerContext, WorkerResult};
use crate::envelope::{Envelope, WorkerName};
use async_trait::async_trait;
use serde_json::Value;

/// What the runtime should send after a handler returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Send a `response` with this payload.
    Response(Value),
    /// Send a `result` with this payload.
    Result(Value),
    /// Send a `status` with this payload.
    Status(Value),
    /// Send nothing now; the worker answers later through its outbox.
    Deferred,
    /// The worker does not handle this type.
    Unhandled,
}

/// Domain logic of a worker.
///
/// Handlers run one at a time in arrival order. Long-running work should be
/// spawned so the runtime keeps receiving the replies it awaits.
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Identity the worker registers under.
    fn name(&self) -> &WorkerName;

    /// Configuration the worker starts with.
    fn initial_config(&self) -> WorkerConfig {
        WorkerConfig::new()
    }

    /// Handles an envelope that is neither a configuration request nor a
    /// correlated reply.
    ///
    /// # Errors
    ///
    /// Any error is reported to the sender as an `error` envelope.
    async fn handle(&self, envelope: Envelope, ctx: &WorkerContext) -> WorkerResult<Reply>;
}
