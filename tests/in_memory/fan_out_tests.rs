//! End-to-end tests for fan-out delivery.

use super::helpers::{Harness, id};
use courier::envelope::{ChatTurn, EnvelopeKind};
use courier::router::DeliveryPolicy;
use courier::workers::{EchoWorker, GenerationWorker, ScriptedGenerator};
use rstest::rstest;
use std::collections::BTreeMap;
use std::sync::Arc;

#[rstest]
#[tokio::test]
async fn every_worker_answers_the_same_request() {
    let mut harness = Harness::start(DeliveryPolicy::FanOut).await;
    harness.spawn(EchoWorker::new());
    harness.spawn(GenerationWorker::new(Arc::new(ScriptedGenerator::new())));
    harness.await_registered(&["echo", "generation"]).await;

    harness.ask("hello", "user-1");

    let mut replies = BTreeMap::new();
    for _ in 0..2 {
        let reply = harness.next().await;
        assert_eq!(reply.kind, EnvelopeKind::AgentMessage);
        assert_eq!(reply.request_id, Some(id("user-1")));
        let turn = ChatTurn::from_envelope(&reply).expect("chat turn");
        replies.insert(reply.name.as_str().to_owned(), turn.content);
    }
    harness.assert_silent().await;

    assert_eq!(
        replies.get("echo").map(String::as_str),
        Some("Echo, hello, from Echo as assistant")
    );
    assert_eq!(
        replies.get("generation").map(String::as_str),
        Some("You said, \"hello\"")
    );
}

#[rstest]
#[tokio::test]
async fn fan_out_without_workers_is_an_error() {
    let mut harness = Harness::start(DeliveryPolicy::FanOut).await;

    harness.ask("hello", "user-2");

    let reply = harness.next().await;
    assert_eq!(reply.kind, EnvelopeKind::Error);
    assert_eq!(
        reply.error_message().as_deref(),
        Some("No workers registered to receive the message")
    );
}
