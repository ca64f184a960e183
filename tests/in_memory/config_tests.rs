//! End-to-end tests for `/config` commands and saved configuration.

use super::helpers::{Harness, id, name};
use courier::directory::KnownWorker;
use courier::directory::adapters::memory::InMemoryWorkerDirectory;
use courier::envelope::EnvelopeKind;
use courier::router::DeliveryPolicy;
use courier::worker::WorkerConfig;
use courier::workers::EchoWorker;
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

#[rstest]
#[tokio::test]
async fn set_changes_behaviour_and_persists() {
    let mut harness = Harness::start(DeliveryPolicy::FanOut).await;
    harness.spawn(EchoWorker::new());
    harness.await_registered(&["echo"]).await;

    harness.ask("/config echo set user Parrot", "user-1");
    let ack = harness.next().await;
    assert_eq!(ack.kind, EnvelopeKind::AgentMessage);
    assert_eq!(ack.request_id, Some(id("user-1")));
    assert_eq!(
        ack.payload.as_ref().and_then(|payload| payload.get("status")),
        Some(&json!("config-updated"))
    );

    harness.ask("hi", "user-2");
    let reply = harness.next().await;
    assert_eq!(
        reply.payload.as_ref().and_then(|payload| payload.get("content")),
        Some(&json!("Echo, hi, from Parrot as assistant"))
    );

    let mut persisted = None;
    for _ in 0..50 {
        persisted = harness.directory.config_of(&name("echo"));
        if persisted.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(
        persisted.map(|config| config.to_value()),
        Some(json!({"user": "Parrot"}))
    );
}

#[rstest]
#[tokio::test]
async fn get_reads_a_single_key() {
    let mut harness = Harness::start(DeliveryPolicy::FanOut).await;
    harness.spawn(EchoWorker::new());
    harness.await_registered(&["echo"]).await;

    harness.ask("/config echo get user", "user-1");

    let reply = harness.next().await;
    assert_eq!(reply.request_id, Some(id("user-1")));
    assert_eq!(reply.payload, Some(json!({"key": "user", "value": "Echo"})));
}

#[rstest]
#[tokio::test]
async fn saved_configuration_is_restored_on_registration() {
    let directory = InMemoryWorkerDirectory::new().with_worker(
        KnownWorker::new(name("echo")).with_config(WorkerConfig::new().with("user", "Saved")),
    );
    let mut harness = Harness::start_with(DeliveryPolicy::FanOut, directory).await;
    harness.spawn(EchoWorker::new());
    harness.await_registered(&["echo"]).await;

    harness.ask("hi", "user-1");

    let reply = harness.next().await;
    assert_eq!(
        reply.payload.as_ref().and_then(|payload| payload.get("content")),
        Some(&json!("Echo, hi, from Saved as assistant"))
    );
    harness.assert_silent().await;
}

#[rstest]
#[tokio::test]
async fn unknown_worker_is_reported() {
    let mut harness = Harness::start(DeliveryPolicy::FanOut).await;

    harness.ask("/config ghost get", "user-1");

    let reply = harness.next().await;
    assert_eq!(reply.kind, EnvelopeKind::Error);
    assert_eq!(reply.error_message().as_deref(), Some("Unknown worker: ghost"));
}
