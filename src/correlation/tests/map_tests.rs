//! Unit tests for the correlation map.

use crate::correlation::{CorrelationError, CorrelationMap, CorrelationSettings, Settlement};
use crate::envelope::{ChainId, Envelope, EnvelopeKind, WorkerName};
use rstest::{fixture, rstest};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;

#[fixture]
fn base() -> ChainId {
    ChainId::parse("user-1").expect("valid chain id")
}

#[fixture]
fn map() -> CorrelationMap {
    CorrelationMap::new(CorrelationSettings::with_timeout_ms(1_000))
}

fn reply(kind: EnvelopeKind, request_id: &ChainId) -> Envelope {
    Envelope::new(kind, WorkerName::new("memory").expect("valid name"))
        .with_request_id(request_id.clone())
}

#[rstest]
#[tokio::test]
async fn begin_derives_unique_children(map: CorrelationMap, base: ChainId) {
    let mut ids = HashSet::new();
    let mut handles = Vec::new();
    for _ in 0..64 {
        let (id, pending) = map.begin(&base).expect("begin");
        assert!(id.to_string().starts_with("user-1:"));
        assert_eq!(id.parent(), Some(base.clone()));
        assert_eq!(pending.request_id(), &id);
        ids.insert(id);
        handles.push(pending);
    }
    assert_eq!(ids.len(), 64);
    assert_eq!(map.pending_count(), 64);
}

#[rstest]
#[tokio::test]
async fn resolve_delivers_payload_once(map: CorrelationMap, base: ChainId) {
    let (id, pending) = map.begin(&base).expect("begin");

    assert!(map.resolve(&id, json!({"ok": true})));
    assert!(!map.resolve(&id, json!({"ok": false})));
    assert!(!map.is_pending(&id));
    assert_eq!(pending.wait().await, Ok(json!({"ok": true})));
}

#[rstest]
#[tokio::test]
async fn reject_delivers_error_text(map: CorrelationMap, base: ChainId) {
    let (id, pending) = map.begin(&base).expect("begin");

    assert!(map.reject(&id, "memory unavailable"));
    let error = pending.wait().await.expect_err("rejected");
    assert_eq!(error.to_string(), "memory unavailable");
    assert!(!error.is_timeout());
}

#[rstest]
#[tokio::test]
async fn unknown_ids_are_no_ops(map: CorrelationMap, base: ChainId) {
    assert!(!map.resolve(&base, json!(null)));
    assert!(!map.reject(&base, "nope"));
}

#[rstest]
#[case(EnvelopeKind::Response, Settlement::Resolved)]
#[case(EnvelopeKind::Result, Settlement::Resolved)]
#[case(EnvelopeKind::Error, Settlement::Rejected)]
#[tokio::test]
async fn settle_maps_reply_kinds(
    map: CorrelationMap,
    base: ChainId,
    #[case] kind: EnvelopeKind,
    #[case] expected: Settlement,
) {
    let (id, _pending) = map.begin(&base).expect("begin");
    assert_eq!(map.settle(&reply(kind.clone(), &id)), expected);
    assert_eq!(map.settle(&reply(kind, &id)), Settlement::Unmatched);
}

#[rstest]
#[tokio::test]
async fn settle_ignores_non_replies(map: CorrelationMap, base: ChainId) {
    let (id, _pending) = map.begin(&base).expect("begin");
    assert_eq!(
        map.settle(&reply(EnvelopeKind::Status, &id)),
        Settlement::NotReply
    );
    assert!(map.is_pending(&id));
}

#[rstest]
#[tokio::test]
async fn error_envelope_payload_text_is_used() {
    let map = CorrelationMap::new(CorrelationSettings::default());
    let base = ChainId::parse("u").expect("valid chain id");
    let (id, pending) = map.begin(&base).expect("begin");

    let envelope = Envelope::failure(
        WorkerName::new("generation").expect("valid name"),
        "model offline",
        Some(id),
    );
    assert_eq!(map.settle(&envelope), Settlement::Rejected);
    assert_eq!(
        pending.wait().await.map_err(|err| err.to_string()),
        Err("model offline".to_owned())
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn timeout_rejects_exactly_once(map: CorrelationMap, base: ChainId) {
    let (id, pending) = map.begin(&base).expect("begin");

    tokio::time::sleep(Duration::from_millis(1_001)).await;

    let error = pending.wait().await.expect_err("timed out");
    assert!(error.is_timeout());
    assert_eq!(error.request_id(), &id);
    assert!(!map.is_pending(&id));
    assert!(!map.resolve(&id, json!("late")));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn reply_before_deadline_wins(map: CorrelationMap, base: ChainId) {
    let (id, pending) = map.begin(&base).expect("begin");
    tokio::time::sleep(Duration::from_millis(999)).await;
    assert!(map.resolve(&id, json!(1)));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(pending.wait().await, Ok(json!(1)));
}

#[rstest]
#[tokio::test]
async fn cancel_all_rejects_every_waiter(map: CorrelationMap, base: ChainId) {
    let (first, first_reply) = map.begin(&base).expect("begin");
    let (_, second_reply) = map.begin(&base).expect("begin");

    map.cancel_all();

    assert_eq!(map.pending_count(), 0);
    assert_eq!(
        first_reply.wait().await,
        Err(CorrelationError::Cancelled { request_id: first })
    );
    assert!(matches!(
        second_reply.wait().await,
        Err(CorrelationError::Cancelled { .. })
    ));
}

#[rstest]
#[tokio::test]
async fn pending_lists_deadlines(map: CorrelationMap, base: ChainId) {
    let before = chrono::Utc::now();
    let (id, _pending) = map.begin(&base).expect("begin");

    let summaries = map.pending();
    assert_eq!(summaries.len(), 1);
    let summary = summaries.first().expect("one summary");
    assert_eq!(summary.request_id, id);
    assert!(summary.deadline >= before + chrono::TimeDelta::milliseconds(1_000));
}

#[rstest]
#[tokio::test]
async fn dropping_the_map_cancels_waiters(base: ChainId) {
    let map = CorrelationMap::new(CorrelationSettings::default());
    let (_, pending) = map.begin(&base).expect("begin");
    drop(map);

    assert!(matches!(
        pending.wait().await,
        Err(CorrelationError::Cancelled { .. })
    ));
}
