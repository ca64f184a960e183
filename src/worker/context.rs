//! Handles passed to worker handlers.

use super::{WorkerConfig, WorkerResult};
use crate::correlation::{CorrelationError, CorrelationMap};
use crate::envelope::{ChainId, Envelope, EnvelopeKind, ForwardRequest, WorkerName};
use crate::transport::EnvelopeSender;
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error};

/// Outbound side of a worker's channel.
///
/// Every envelope is stamped with the worker identity before it is sent.
/// Sending on a closed channel logs an error and is otherwise a no-op.
#[derive(Debug, Clone)]
pub struct Outbox {
    name: WorkerName,
    sender: EnvelopeSender,
}

impl Outbox {
    /// Creates an outbox sending as `name`.
    #[must_use]
    pub const fn new(name: WorkerName, sender: EnvelopeSender) -> Self {
        Self { name, sender }
    }

    /// Returns the identity stamped on outbound envelopes.
    #[must_use]
    pub const fn name(&self) -> &WorkerName {
        &self.name
    }

    /// Sends an envelope, returning whether it was queued.
    pub fn post(&self, envelope: Envelope) -> bool {
        let stamped = envelope.stamped(&self.name);
        let kind = stamped.kind.clone();
        match self.sender.send(stamped) {
            Ok(()) => true,
            Err(err) => {
                error!(worker = %self.name, kind = %kind, error = %err, "cannot send envelope");
                false
            }
        }
    }

    /// Sends an envelope of `kind` with `payload`.
    pub fn send(&self, kind: EnvelopeKind, payload: Value, request_id: Option<ChainId>) -> bool {
        self.post(
            Envelope::new(kind, self.name.clone())
                .with_payload(payload)
                .with_optional_request_id(request_id),
        )
    }

    /// Sends a `response` with `payload`.
    pub fn respond(&self, payload: Value, request_id: Option<ChainId>) -> bool {
        self.send(EnvelopeKind::Response, payload, request_id)
    }

    /// Sends an `error` carrying `message`.
    pub fn fail(&self, message: impl Into<String>, request_id: Option<ChainId>) -> bool {
        self.post(Envelope::failure(self.name.clone(), message, request_id))
    }
}

/// Context shared by a worker's handlers and the tasks they spawn.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    outbox: Outbox,
    correlation: CorrelationMap,
    config: Arc<RwLock<WorkerConfig>>,
}

impl WorkerContext {
    /// Creates a context.
    #[must_use]
    pub fn new(outbox: Outbox, correlation: CorrelationMap, config: WorkerConfig) -> Self {
        Self {
            outbox,
            correlation,
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Returns the worker identity.
    #[must_use]
    pub const fn name(&self) -> &WorkerName {
        self.outbox.name()
    }

    /// Returns the outbox.
    #[must_use]
    pub const fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Returns the worker's correlation map.
    #[must_use]
    pub const fn correlation(&self) -> &CorrelationMap {
        &self.correlation
    }

    /// Returns a snapshot of the current configuration.
    #[must_use]
    pub fn config(&self) -> WorkerConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merges `patch` into the configuration and returns the result.
    pub fn update_config(&self, patch: &WorkerConfig) -> WorkerConfig {
        let mut config = self.config.write().unwrap_or_else(PoisonError::into_inner);
        config.merge(patch);
        config.clone()
    }

    /// Sends a correlated request to `target` through the router and waits
    /// for its reply payload.
    ///
    /// The request id is `base` with one fresh task segment appended.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::Correlation`](super::WorkerError::Correlation)
    /// when the reply is an `error`, the deadline expires, or the outbound
    /// channel is gone.
    pub async fn forward(
        &self,
        target: &WorkerName,
        kind: EnvelopeKind,
        payload: Value,
        base: &ChainId,
    ) -> WorkerResult<Value> {
        let (request_id, pending) = self.correlation.begin(base)?;
        let inner = Envelope::new(kind.clone(), self.name().clone())
            .with_payload(payload)
            .with_request_id(request_id.clone());
        let forward = ForwardRequest::new(target.clone(), inner).into_envelope(self.name().clone())?;

        debug!(
            worker = %self.name(),
            target = %target,
            kind = %kind,
            request_id = %request_id,
            "forwarding request"
        );
        if !self.outbox.post(forward) {
            self.correlation.fail(
                &request_id,
                CorrelationError::Disconnected {
                    request_id: request_id.clone(),
                },
            );
        }
        Ok(pending.wait().await?)
    }
}
