//! The QnA workflow worker.

use super::compose_prompt;
use crate::envelope::{ChainId, ChatTurn, ContextBundle, Envelope, EnvelopeKind, Role, WorkerName};
use crate::worker::{Reply, Worker, WorkerConfig, WorkerContext, WorkerError, WorkerResult};
use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

/// Config key naming the memory worker.
pub const MEMORY_WORKER_KEY: &str = "memory_worker";

/// Config key naming the generation worker.
pub const GENERATION_WORKER_KEY: &str = "generation_worker";

const DEFAULT_NAME: &str = "orchestrator";
const DEFAULT_MEMORY_WORKER: &str = "memory";
const DEFAULT_GENERATION_WORKER: &str = "generation";

/// Prefix of the root id minted for triggers that arrive without one.
const GENERATED_ROOT_PREFIX: &str = "qna";

/// Orchestrates the question-answering workflow.
///
/// A `user-message` with role `user` and non-empty content starts one
/// workflow. The handler returns immediately; the workflow answers later with
/// exactly one `response` or `error` carrying the trigger's request id.
#[derive(Debug, Clone)]
pub struct QnaOrchestrator {
    name: WorkerName,
}

impl QnaOrchestrator {
    /// Creates the orchestrator under its canonical name.
    #[must_use]
    pub fn new() -> Self {
        Self::named(WorkerName::from_static(DEFAULT_NAME))
    }

    /// Creates the orchestrator under `name`.
    #[must_use]
    pub const fn named(name: WorkerName) -> Self {
        Self { name }
    }
}

impl Default for QnaOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Worker for QnaOrchestrator {
    fn name(&self) -> &WorkerName {
        &self.name
    }

    fn initial_config(&self) -> WorkerConfig {
        WorkerConfig::new()
            .with(MEMORY_WORKER_KEY, DEFAULT_MEMORY_WORKER)
            .with(GENERATION_WORKER_KEY, DEFAULT_GENERATION_WORKER)
    }

    async fn handle(&self, envelope: Envelope, ctx: &WorkerContext) -> WorkerResult<Reply> {
        if envelope.kind != EnvelopeKind::UserMessage {
            return Ok(Reply::Unhandled);
        }
        let question = ChatTurn::from_envelope(&envelope)
            .ok()
            .filter(ChatTurn::is_user)
            .ok_or_else(|| {
                WorkerError::InvalidPayload(
                    "a QnA flow needs a user message with role 'user' and non-empty content"
                        .to_owned(),
                )
            })?;
        let targets = Targets::from_config(&ctx.config())?;
        let root = envelope
            .request_id
            .unwrap_or_else(|| ChainId::generate(GENERATED_ROOT_PREFIX));

        info!(worker = %ctx.name(), request_id = %root, "starting QnA flow");
        let flow_ctx = ctx.clone();
        tokio::spawn(async move {
            match answer(&flow_ctx, &targets, &question, &root).await {
                Ok(reply) => {
                    info!(worker = %flow_ctx.name(), request_id = %root, "QnA flow completed");
                    flow_ctx.outbox().respond(reply.to_value(), Some(root));
                }
                Err(err) => {
                    warn!(
                        worker = %flow_ctx.name(),
                        request_id = %root,
                        error = %err,
                        "QnA flow failed"
                    );
                    flow_ctx
                        .outbox()
                        .fail(format!("QnA flow failed: {err}"), Some(root));
                }
            }
        });
        Ok(Reply::Deferred)
    }
}

/// Workers the flow talks to.
#[derive(Debug, Clone)]
struct Targets {
    memory: WorkerName,
    generation: WorkerName,
}

impl Targets {
    fn from_config(config: &WorkerConfig) -> WorkerResult<Self> {
        Ok(Self {
            memory: target(config, MEMORY_WORKER_KEY, DEFAULT_MEMORY_WORKER)?,
            generation: target(config, GENERATION_WORKER_KEY, DEFAULT_GENERATION_WORKER)?,
        })
    }
}

fn target(config: &WorkerConfig, key: &str, default: &str) -> WorkerResult<WorkerName> {
    let raw = match config.get(key) {
        None => default,
        Some(value) => value
            .as_str()
            .ok_or_else(|| WorkerError::InvalidConfig(format!("'{key}' must be a string")))?,
    };
    WorkerName::new(raw).map_err(|err| WorkerError::InvalidConfig(format!("'{key}': {err}")))
}

/// Runs the five workflow steps; the first failure aborts the rest.
async fn answer(
    ctx: &WorkerContext,
    targets: &Targets,
    question: &ChatTurn,
    root: &ChainId,
) -> WorkerResult<ChatTurn> {
    remember(ctx, &targets.memory, question, root).await?;

    let context_payload = ctx
        .forward(
            &targets.memory,
            EnvelopeKind::custom("build-context"),
            json!({ "currentMessage": question.content }),
            root,
        )
        .await?;
    let context = ContextBundle::from_payload(&context_payload)?;
    debug!(
        worker = %ctx.name(),
        request_id = %root,
        recent = context.recent_messages.len(),
        relevant = context.relevant_memories.len(),
        "context received"
    );

    let prompt = compose_prompt(&context, &question.content);
    let generated = ctx
        .forward(
            &targets.generation,
            EnvelopeKind::custom("generate-prompt"),
            ChatTurn::user(prompt).to_value(),
            root,
        )
        .await?;
    let reply = ChatTurn::from_payload(&generated)
        .ok()
        .filter(|turn| turn.role == Role::Assistant)
        .ok_or_else(|| {
            WorkerError::failed(format!(
                "invalid response payload from {}: expected an assistant turn",
                targets.generation
            ))
        })?;

    remember(ctx, &targets.memory, &reply, root).await?;
    Ok(reply)
}

async fn remember(
    ctx: &WorkerContext,
    memory: &WorkerName,
    turn: &ChatTurn,
    root: &ChainId,
) -> WorkerResult<()> {
    ctx.forward(
        memory,
        EnvelopeKind::Command,
        json!({ "command": "addMessage", "data": turn.to_value() }),
        root,
    )
    .await?;
    Ok(())
}
