//! Event loop driving one worker.

use super::{Outbox, Reply, Worker, WorkerConfig, WorkerContext};
use crate::correlation::{CorrelationMap, CorrelationSettings, Settlement};
use crate::envelope::{Envelope, EnvelopeKind};
use crate::transport::Endpoint;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Owns a worker and its end of the channel.
pub struct WorkerRuntime<W: Worker> {
    worker: Arc<W>,
    endpoint: Endpoint,
    correlation: CorrelationMap,
}

impl<W: Worker> WorkerRuntime<W> {
    /// Creates a runtime for `worker` speaking over `endpoint`.
    #[must_use]
    pub fn new(worker: W, endpoint: Endpoint, settings: CorrelationSettings) -> Self {
        Self::with_correlation(worker, endpoint, CorrelationMap::new(settings))
    }

    /// Creates a runtime using an existing correlation map.
    #[must_use]
    pub fn with_correlation(worker: W, endpoint: Endpoint, correlation: CorrelationMap) -> Self {
        Self {
            worker: Arc::new(worker),
            endpoint,
            correlation,
        }
    }

    /// Runs the worker on a new task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Processes inbound envelopes until the channel closes.
    ///
    /// Pending correlated requests are cancelled when the loop ends.
    pub async fn run(self) {
        let Self {
            worker,
            endpoint,
            correlation,
        } = self;
        let (sender, mut receiver) = endpoint.split();
        let name = worker.name().clone();
        let ctx = WorkerContext::new(
            Outbox::new(name.clone(), sender),
            correlation,
            worker.initial_config(),
        );

        info!(worker = %name, "worker runtime started");
        while let Some(envelope) = receiver.recv().await {
            dispatch(worker.as_ref(), &ctx, envelope).await;
        }
        ctx.correlation().cancel_all();
        info!(worker = %name, "worker runtime stopped");
    }
}

async fn dispatch<W: Worker>(worker: &W, ctx: &WorkerContext, envelope: Envelope) {
    match ctx.correlation().settle(&envelope) {
        Settlement::Resolved | Settlement::Rejected => return,
        Settlement::Unmatched => {
            debug!(
                worker = %ctx.name(),
                kind = %envelope.kind,
                request_id = ?envelope.request_id.as_ref().map(ToString::to_string),
                "discarding reply with no pending request"
            );
            return;
        }
        Settlement::NotReply => {}
    }

    match envelope.kind {
        EnvelopeKind::SetConfig => apply_config(ctx, &envelope),
        EnvelopeKind::GetConfig => read_config(ctx, &envelope),
        _ => run_handler(worker, ctx, envelope).await,
    }
}

fn apply_config(ctx: &WorkerContext, envelope: &Envelope) {
    let request_id = envelope.request_id.clone();
    let Some(patch) = envelope.payload.as_ref().and_then(WorkerConfig::from_value) else {
        ctx.outbox()
            .fail("set-config payload must be a JSON object", request_id);
        return;
    };
    let config = ctx.update_config(&patch);
    debug!(worker = %ctx.name(), "configuration updated");
    ctx.outbox().respond(
        json!({ "status": "config-updated", "config": config.to_value() }),
        request_id,
    );
}

fn read_config(ctx: &WorkerContext, envelope: &Envelope) {
    let config = ctx.config();
    let key = envelope
        .payload
        .as_ref()
        .and_then(|payload| payload.get("key"))
        .and_then(Value::as_str);
    let payload = match key {
        Some(wanted) => json!({
            "key": wanted,
            "value": config.get(wanted).cloned().unwrap_or(Value::Null),
        }),
        None => json!({ "config": config.to_value() }),
    };
    ctx.outbox().respond(payload, envelope.request_id.clone());
}

async fn run_handler<W: Worker>(worker: &W, ctx: &WorkerContext, envelope: Envelope) {
    let kind = envelope.kind.clone();
    let request_id = envelope.request_id.clone();
    let outbox = ctx.outbox();

    match worker.handle(envelope, ctx).await {
        Ok(Reply::Response(payload)) => {
            outbox.send(EnvelopeKind::Response, payload, request_id);
        }
        Ok(Reply::Result(payload)) => {
            outbox.send(EnvelopeKind::Result, payload, request_id);
        }
        Ok(Reply::Status(payload)) => {
            outbox.send(EnvelopeKind::Status, payload, request_id);
        }
        Ok(Reply::Deferred) => {}
        Ok(Reply::Unhandled) => {
            warn!(worker = %ctx.name(), kind = %kind, "unhandled message type");
            outbox.fail(
                format!("Worker {} cannot handle message type: {kind}", ctx.name()),
                request_id,
            );
        }
        Err(err) => {
            warn!(worker = %ctx.name(), kind = %kind, error = %err, "handler failed");
            outbox.fail(err.to_string(), request_id);
        }
    }
}
