//! Worker exposing the conversation memory.

use super::store::DEFAULT_HISTORY_SIZE;
use super::{ContextOptions, ConversationMemory};
use crate::envelope::{ChatTurn, Envelope, EnvelopeKind, WorkerName};
use crate::worker::{Reply, Worker, WorkerConfig, WorkerContext, WorkerError, WorkerResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Config key holding the maximum number of stored turns.
pub const HISTORY_SIZE_KEY: &str = "history_size";

const DEFAULT_NAME: &str = "memory";

/// Commands understood by the memory worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemoryCommand {
    AddMessage,
    GetRecentMessages,
    GetRelevantMemories,
    BuildContext,
    ClearMemory,
}

impl MemoryCommand {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "addMessage" | "add-message" => Some(Self::AddMessage),
            "getRecentMessages" | "get-recent-messages" => Some(Self::GetRecentMessages),
            "getRelevantMemories" | "get-relevant-memories" => Some(Self::GetRelevantMemories),
            "buildContext" | "build-context" => Some(Self::BuildContext),
            "clearMemory" | "clear-memory" => Some(Self::ClearMemory),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RecentQuery {
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RelevantQuery {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextQuery {
    current_message: String,
    #[serde(default)]
    options: ContextOptions,
}

/// Keeps the conversation history and answers context queries.
///
/// Commands arrive either as a `command` envelope whose payload names the
/// command (`{"command": "addMessage", "data": {...}}`) or as the envelope
/// type itself (`build-context`). camelCase and kebab-case names are both
/// accepted.
#[derive(Debug)]
pub struct MemoryWorker {
    name: WorkerName,
    memory: Mutex<ConversationMemory>,
}

impl MemoryWorker {
    /// Creates the worker under its canonical name.
    #[must_use]
    pub fn new() -> Self {
        Self::named(WorkerName::from_static(DEFAULT_NAME))
    }

    /// Creates the worker under `name`.
    #[must_use]
    pub fn named(name: WorkerName) -> Self {
        Self {
            name,
            memory: Mutex::new(ConversationMemory::default()),
        }
    }

    /// Returns a copy of the stored history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<ChatTurn> {
        self.memory
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recent(None)
    }

    fn execute(
        &self,
        command: MemoryCommand,
        payload: &Value,
        config: &WorkerConfig,
    ) -> WorkerResult<Value> {
        let mut memory = self.memory.lock().unwrap_or_else(PoisonError::into_inner);
        memory.set_capacity(config.get_usize(HISTORY_SIZE_KEY).unwrap_or(DEFAULT_HISTORY_SIZE));

        match command {
            MemoryCommand::AddMessage => {
                let turn = payload
                    .get("data")
                    .ok_or_else(|| invalid("addMessage requires 'data' with role and content"))
                    .and_then(|data| ChatTurn::from_payload(data).map_err(WorkerError::from))?;
                let added = turn.to_value();
                memory.add(turn);
                Ok(json!({ "status": "Message added", "added": added }))
            }
            MemoryCommand::GetRecentMessages => {
                let query: RecentQuery = decode(payload, "getRecentMessages")?;
                Ok(turns_value(&memory.recent(query.limit)))
            }
            MemoryCommand::GetRelevantMemories => {
                let query: RelevantQuery = decode(payload, "getRelevantMemories")?;
                Ok(turns_value(&memory.relevant(&query.query, query.limit)))
            }
            MemoryCommand::BuildContext => {
                let query: ContextQuery = decode(payload, "buildContext")?;
                Ok(memory
                    .build_context(&query.current_message, query.options)
                    .to_value())
            }
            MemoryCommand::ClearMemory => {
                let removed = memory.clear();
                Ok(json!({ "status": "Memory cleared", "removed": removed }))
            }
        }
    }
}

impl Default for MemoryWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Worker for MemoryWorker {
    fn name(&self) -> &WorkerName {
        &self.name
    }

    fn initial_config(&self) -> WorkerConfig {
        WorkerConfig::new().with(HISTORY_SIZE_KEY, DEFAULT_HISTORY_SIZE)
    }

    async fn handle(&self, envelope: Envelope, ctx: &WorkerContext) -> WorkerResult<Reply> {
        let empty = Value::Null;
        let payload = envelope.payload.as_ref().unwrap_or(&empty);
        let command = match &envelope.kind {
            EnvelopeKind::Command => {
                let raw = payload
                    .get("command")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("command envelope requires a 'command' string"))?;
                MemoryCommand::parse(raw)
                    .ok_or_else(|| WorkerError::failed(format!("Unknown command: {raw}")))?
            }
            EnvelopeKind::Custom(raw) => match MemoryCommand::parse(raw) {
                Some(command) => command,
                None => return Ok(Reply::Unhandled),
            },
            _ => return Ok(Reply::Unhandled),
        };

        debug!(worker = %self.name, command = ?command, "memory command");
        self.execute(command, payload, &ctx.config())
            .map(Reply::Response)
    }
}

fn invalid(message: &str) -> WorkerError {
    WorkerError::InvalidPayload(message.to_owned())
}

fn decode<T: for<'de> Deserialize<'de>>(payload: &Value, command: &str) -> WorkerResult<T> {
    let empty = json!({});
    let source = if payload.is_null() { &empty } else { payload };
    T::deserialize(source)
        .map_err(|err| WorkerError::InvalidPayload(format!("invalid payload for {command}: {err}")))
}

fn turns_value(turns: &[ChatTurn]) -> Value {
    Value::Array(turns.iter().map(ChatTurn::to_value).collect())
}
