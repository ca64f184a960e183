//! End-to-end tests for the question-answering workflow.

use super::helpers::{Harness, id};
use async_trait::async_trait;
use courier::envelope::{ChatTurn, Envelope, EnvelopeKind, WorkerName};
use courier::orchestrator::QnaOrchestrator;
use courier::router::DeliveryPolicy;
use courier::worker::{Reply, Worker, WorkerContext, WorkerError, WorkerResult};
use courier::workers::{GenerationWorker, ScriptedGenerator};
use rstest::rstest;
use serde_json::json;
use std::sync::Arc;

/// Memory stand-in that records messages but cannot build context.
struct BrokenMemory {
    name: WorkerName,
}

#[async_trait]
impl Worker for BrokenMemory {
    fn name(&self) -> &WorkerName {
        &self.name
    }

    async fn handle(&self, envelope: Envelope, _ctx: &WorkerContext) -> WorkerResult<Reply> {
        match envelope.kind {
            EnvelopeKind::Command => Ok(Reply::Response(json!({"status": "Message added"}))),
            EnvelopeKind::Custom(_) => Err(WorkerError::failed("memory store unavailable")),
            _ => Ok(Reply::Unhandled),
        }
    }
}

#[rstest]
#[tokio::test]
async fn question_yields_one_response_with_root_id() {
    let mut harness = Harness::start(DeliveryPolicy::default()).await;
    let generator = Arc::new(ScriptedGenerator::new().with_reply("Your cat is called Rex."));
    harness.spawn_qna(generator.clone());
    harness
        .await_registered(&["orchestrator", "memory", "generation"])
        .await;

    harness.ask("what is my cat called?", "user-1");

    let reply = harness.next().await;
    assert_eq!(reply.kind, EnvelopeKind::AgentMessage);
    assert_eq!(reply.name.as_str(), "orchestrator");
    assert_eq!(reply.request_id, Some(id("user-1")));
    assert_eq!(reply.error, None);
    assert_eq!(
        ChatTurn::from_envelope(&reply).expect("assistant turn"),
        ChatTurn::assistant("Your cat is called Rex.")
    );
    harness.assert_silent().await;

    assert_eq!(
        generator.prompts(),
        vec![ChatTurn::user("Current user message:\n- user: what is my cat called?")]
    );
    let snapshot = harness.router.snapshot().await.expect("snapshot");
    assert!(snapshot.pending_forwards.is_empty());
}

#[rstest]
#[tokio::test]
async fn conversation_history_feeds_later_prompts() {
    let mut harness = Harness::start(DeliveryPolicy::default()).await;
    let generator = Arc::new(
        ScriptedGenerator::new()
            .with_reply("Nice to meet Rex.")
            .with_reply("Rex."),
    );
    harness.spawn_qna(generator.clone());
    harness
        .await_registered(&["orchestrator", "memory", "generation"])
        .await;

    harness.ask("my cat is called Rex", "user-1");
    assert_eq!(harness.next().await.request_id, Some(id("user-1")));
    harness.ask("what is my cat called?", "user-2");
    let second = harness.next().await;
    assert_eq!(second.request_id, Some(id("user-2")));

    let last_prompt = generator.prompts().pop().expect("second prompt");
    assert_eq!(
        last_prompt.content,
        concat!(
            "Recent conversation:\n",
            "- user: my cat is called Rex\n",
            "- assistant: Nice to meet Rex.\n",
            "\n",
            "Current user message:\n",
            "- user: what is my cat called?",
        )
    );
}

#[rstest]
#[tokio::test]
async fn context_failure_yields_one_error_and_no_generation() {
    let mut harness = Harness::start(DeliveryPolicy::default()).await;
    let generator = Arc::new(ScriptedGenerator::new());
    harness.spawn(BrokenMemory {
        name: WorkerName::new("memory").expect("valid name"),
    });
    harness.spawn(GenerationWorker::new(generator.clone()));
    harness.spawn(QnaOrchestrator::new());
    harness
        .await_registered(&["orchestrator", "memory", "generation"])
        .await;

    harness.ask("hello", "user-9");

    let reply = harness.next().await;
    assert_eq!(reply.kind, EnvelopeKind::AgentMessage);
    assert_eq!(reply.request_id, Some(id("user-9")));
    assert_eq!(
        reply.error.as_deref(),
        Some("QnA flow failed: memory store unavailable")
    );
    harness.assert_silent().await;
    assert!(generator.prompts().is_empty());
}

#[rstest]
#[tokio::test]
async fn missing_memory_worker_fails_the_flow() {
    let mut harness = Harness::start(DeliveryPolicy::default()).await;
    harness.spawn(QnaOrchestrator::new());
    harness.await_registered(&["orchestrator"]).await;

    harness.ask("hello", "user-3");

    let reply = harness.next().await;
    assert_eq!(reply.request_id, Some(id("user-3")));
    assert_eq!(
        reply.error.as_deref(),
        Some("QnA flow failed: Target worker not found: memory")
    );
}

#[rstest]
#[tokio::test]
async fn missing_orchestrator_is_reported_by_router() {
    let mut harness = Harness::start(DeliveryPolicy::default()).await;

    harness.ask("hello", "user-4");

    let reply = harness.next().await;
    assert_eq!(reply.kind, EnvelopeKind::Error);
    assert_eq!(reply.name.as_str(), "router");
    assert_eq!(
        reply.error_message().as_deref(),
        Some("Orchestrator worker not registered: orchestrator")
    );
}
