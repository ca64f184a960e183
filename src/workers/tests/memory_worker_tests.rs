//! Unit tests for the memory worker protocol.

use super::support::{call, spawn_worker};
use crate::envelope::{EnvelopeKind, WorkerName};
use crate::transport::Endpoint;
use crate::workers::MemoryWorker;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

#[fixture]
fn memory() -> Endpoint {
    spawn_worker(MemoryWorker::new())
}

async fn add(peer: &mut Endpoint, role: &str, content: &str) {
    let reply = call(
        peer,
        EnvelopeKind::Command,
        json!({"command": "addMessage", "data": {"role": role, "content": content}}),
    )
    .await;
    assert_eq!(reply.kind, EnvelopeKind::Response, "unexpected {reply:?}");
}

#[rstest]
#[tokio::test]
async fn add_message_confirms(mut memory: Endpoint) {
    let reply = call(
        &mut memory,
        EnvelopeKind::Command,
        json!({"command": "addMessage", "data": {"role": "user", "content": "hi"}}),
    )
    .await;

    assert_eq!(reply.kind, EnvelopeKind::Response);
    assert_eq!(reply.name, WorkerName::new("memory").expect("valid name"));
    assert_eq!(
        reply.payload,
        Some(json!({"status": "Message added", "added": {"role": "user", "content": "hi"}}))
    );
}

#[rstest]
#[case(EnvelopeKind::custom("getRecentMessages"))]
#[case(EnvelopeKind::custom("get-recent-messages"))]
#[tokio::test]
async fn recent_messages_by_type(mut memory: Endpoint, #[case] kind: EnvelopeKind) {
    add(&mut memory, "user", "first").await;
    add(&mut memory, "assistant", "second").await;

    let reply = call(&mut memory, kind, json!({"limit": 1})).await;

    assert_eq!(reply.payload, Some(json!([{"role": "assistant", "content": "second"}])));
}

#[rstest]
#[tokio::test]
async fn build_context_returns_bundle(mut memory: Endpoint) {
    add(&mut memory, "user", "my cat is called Rex").await;
    add(&mut memory, "user", "what is my cat called?").await;

    let reply = call(
        &mut memory,
        EnvelopeKind::custom("build-context"),
        json!({"currentMessage": "what is my cat called?", "options": {"recentLimit": 0}}),
    )
    .await;

    assert_eq!(
        reply.payload,
        Some(json!({
            "recentMessages": [],
            "relevantMemories": [{"role": "user", "content": "my cat is called Rex"}],
        }))
    );
}

#[rstest]
#[tokio::test]
async fn relevant_memories_require_query(mut memory: Endpoint) {
    let reply = call(&mut memory, EnvelopeKind::custom("getRelevantMemories"), json!({})).await;
    assert_eq!(reply.kind, EnvelopeKind::Error);
    assert!(
        reply
            .error_message()
            .is_some_and(|message| message.contains("getRelevantMemories"))
    );
}

#[rstest]
#[tokio::test]
async fn clear_memory_empties_history(mut memory: Endpoint) {
    add(&mut memory, "user", "forget me").await;

    let cleared = call(&mut memory, EnvelopeKind::Command, json!({"command": "clearMemory"})).await;
    assert_eq!(cleared.payload, Some(json!({"status": "Memory cleared", "removed": 1})));

    let recent = call(&mut memory, EnvelopeKind::custom("getRecentMessages"), json!({})).await;
    assert_eq!(recent.payload, Some(json!([])));
}

#[rstest]
#[case(json!({"command": "teleport"}), "Unknown command: teleport")]
#[case(json!({"command": "addMessage", "data": {"role": "user"}}), "invalid chat turn: 'content' must be a string")]
#[case(json!({"command": "addMessage"}), "invalid payload: addMessage requires 'data' with role and content")]
#[tokio::test]
async fn bad_commands_fail(mut memory: Endpoint, #[case] payload: Value, #[case] expected: &str) {
    let reply = call(&mut memory, EnvelopeKind::Command, payload).await;
    assert_eq!(reply.kind, EnvelopeKind::Error);
    assert_eq!(reply.error_message().as_deref(), Some(expected));
}

#[rstest]
#[tokio::test]
async fn history_size_config_bounds_history(mut memory: Endpoint) {
    let ack = call(&mut memory, EnvelopeKind::SetConfig, json!({"history_size": 2})).await;
    assert_eq!(ack.kind, EnvelopeKind::Response);

    add(&mut memory, "user", "one").await;
    add(&mut memory, "user", "two").await;
    add(&mut memory, "user", "three").await;

    let recent = call(&mut memory, EnvelopeKind::custom("getRecentMessages"), json!({})).await;
    assert_eq!(
        recent.payload,
        Some(json!([
            {"role": "user", "content": "two"},
            {"role": "user", "content": "three"},
        ]))
    );
}
