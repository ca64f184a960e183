//! End-to-end tests for workers attached over a byte stream.

use super::helpers::{Harness, id, name};
use courier::envelope::{Envelope, EnvelopeKind};
use courier::router::DeliveryPolicy;
use courier::transport::spawn_json_lines;
use rstest::rstest;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[rstest]
#[tokio::test]
async fn remote_worker_registers_and_answers() {
    let mut harness = Harness::start(DeliveryPolicy::FanOut).await;
    let endpoint = harness.router.connect().expect("connect");
    let (bridge, remote) = tokio::io::duplex(4096);
    let _bridge = spawn_json_lines(bridge, endpoint, name("bridge"));
    let (remote_read, mut remote_write) = tokio::io::split(remote);
    let mut remote_lines = BufReader::new(remote_read).lines();

    remote_write
        .write_all(b"{\"type\":\"register\",\"name\":\"remote\",\"payload\":{\"name\":\"remote\"}}\n")
        .await
        .expect("write register");
    harness.await_registered(&["remote"]).await;

    harness.ask("ping", "user-1");

    let line = remote_lines
        .next_line()
        .await
        .expect("read line")
        .expect("line present");
    let inbound = Envelope::from_json(&line).expect("valid envelope");
    assert_eq!(inbound.kind, EnvelopeKind::UserMessage);
    assert_eq!(inbound.request_id, Some(id("user-1")));

    let reply = json!({
        "type": "response",
        "name": "remote",
        "requestId": "user-1",
        "payload": {"role": "assistant", "content": "pong"}
    });
    remote_write
        .write_all(format!("{reply}\n").as_bytes())
        .await
        .expect("write reply");

    let delivered = harness.next().await;
    assert_eq!(delivered.kind, EnvelopeKind::AgentMessage);
    assert_eq!(delivered.name.as_str(), "remote");
    assert_eq!(delivered.request_id, Some(id("user-1")));
    assert_eq!(
        delivered.payload,
        Some(json!({"role": "assistant", "content": "pong"}))
    );
}

#[rstest]
#[tokio::test]
async fn closing_the_stream_unregisters_the_worker() {
    let harness = Harness::start(DeliveryPolicy::FanOut).await;
    let endpoint = harness.router.connect().expect("connect");
    let (bridge, mut remote) = tokio::io::duplex(4096);
    let bridge_task = spawn_json_lines(bridge, endpoint, name("bridge"));

    remote
        .write_all(b"{\"type\":\"register\",\"name\":\"remote\"}\n")
        .await
        .expect("write register");
    harness.await_registered(&["remote"]).await;

    drop(remote);
    bridge_task.await.expect("bridge joins").ok();

    let mut registered = true;
    for _ in 0..50 {
        registered = harness
            .router
            .snapshot()
            .await
            .expect("snapshot")
            .is_registered("remote");
        if !registered {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(!registered);
}

#[rstest]
#[tokio::test]
async fn remote_sender_gets_an_error_for_an_invalid_envelope() {
    let harness = Harness::start(DeliveryPolicy::FanOut).await;
    let endpoint = harness.router.connect().expect("connect");
    let (bridge, remote) = tokio::io::duplex(4096);
    let _bridge = spawn_json_lines(bridge, endpoint, name("bridge"));
    let (remote_read, mut remote_write) = tokio::io::split(remote);
    let mut remote_lines = BufReader::new(remote_read).lines();

    remote_write
        .write_all(b"{\"type\":\"register\",\"name\":\"remote\"}\n")
        .await
        .expect("write register");
    harness.await_registered(&["remote"]).await;

    remote_write
        .write_all(b"\xff\xfe\n{\"type\":\"user-message\",\"name\":\"remote\",\"requestId\":\"r-1\"}\n")
        .await
        .expect("write invalid lines");

    let mut rejections = Vec::new();
    for _ in 0..2 {
        let line = remote_lines
            .next_line()
            .await
            .expect("read line")
            .expect("line present");
        rejections.push(Envelope::from_json(&line).expect("valid envelope"));
    }
    assert!(rejections.iter().all(|reply| reply.kind == EnvelopeKind::Error));
    assert_eq!(
        rejections.iter().map(|reply| reply.request_id.clone()).collect::<Vec<_>>(),
        vec![None, Some(id("r-1"))]
    );

    let snapshot = harness.router.snapshot().await.expect("snapshot");
    assert!(snapshot.is_registered("remote"));
}
