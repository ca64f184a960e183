//! Shared helpers for driving a worker runtime from tests.

use crate::correlation::CorrelationSettings;
use crate::envelope::{ChainId, Envelope, EnvelopeKind, WorkerName};
use crate::transport::{Endpoint, duplex};
use crate::worker::{Worker, WorkerRuntime};
use serde_json::Value;
use std::time::Duration;

pub(super) fn name(raw: &str) -> WorkerName {
    WorkerName::new(raw).expect("valid name")
}

pub(super) fn spawn_worker<W: Worker>(worker: W) -> Endpoint {
    let (runtime_end, peer) = duplex();
    WorkerRuntime::new(worker, runtime_end, CorrelationSettings::default()).spawn();
    peer
}

/// Sends `kind` with `payload` and returns the reply.
pub(super) async fn call(peer: &mut Endpoint, kind: EnvelopeKind, payload: Value) -> Envelope {
    let request_id = ChainId::generate("test");
    peer.send(
        Envelope::new(kind, name("router"))
            .with_payload(payload)
            .with_request_id(request_id.clone()),
    )
    .expect("send");
    let reply = tokio::time::timeout(Duration::from_secs(5), peer.recv())
        .await
        .expect("reply within deadline")
        .expect("channel open");
    assert_eq!(reply.request_id, Some(request_id));
    reply
}
