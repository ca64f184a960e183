//! Bounded message cache worker.

use crate::envelope::{ChatTurn, Envelope, WorkerName};
use crate::worker::{Reply, Worker, WorkerConfig, WorkerContext, WorkerError, WorkerResult};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Config key holding the maximum number of cached messages.
pub const CACHE_CAPACITY_KEY: &str = "capacity";

const DEFAULT_NAME: &str = "cache";
const DEFAULT_CAPACITY: usize = 500;

/// Caches every chat turn it receives and acknowledges each one.
///
/// `store-message`, `worker-message` and `user-message` envelopes must carry
/// a `{role, content}` payload. Once `capacity` turns are cached the oldest
/// is evicted. `get-messages {limit}` returns the newest `limit` turns,
/// oldest first.
#[derive(Debug)]
pub struct CacheWorker {
    name: WorkerName,
    messages: Mutex<VecDeque<ChatTurn>>,
}

impl CacheWorker {
    /// Creates the worker under its canonical name.
    #[must_use]
    pub fn new() -> Self {
        Self::named(WorkerName::from_static(DEFAULT_NAME))
    }

    /// Creates the worker under `name`.
    #[must_use]
    pub const fn named(name: WorkerName) -> Self {
        Self {
            name,
            messages: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns a copy of the cached turns, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<ChatTurn> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    fn store(&self, turn: ChatTurn, capacity: usize) -> usize {
        let mut messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        messages.push_back(turn);
        while messages.len() > capacity {
            messages.pop_front();
        }
        messages.len()
    }

    fn newest(&self, limit: Option<usize>) -> Vec<ChatTurn> {
        let messages = self.messages.lock().unwrap_or_else(PoisonError::into_inner);
        let skip = limit.map_or(0, |wanted| messages.len().saturating_sub(wanted));
        messages.iter().skip(skip).cloned().collect()
    }
}

impl Default for CacheWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Worker for CacheWorker {
    fn name(&self) -> &WorkerName {
        &self.name
    }

    fn initial_config(&self) -> WorkerConfig {
        WorkerConfig::new().with(CACHE_CAPACITY_KEY, DEFAULT_CAPACITY)
    }

    async fn handle(&self, envelope: Envelope, ctx: &WorkerContext) -> WorkerResult<Reply> {
        match envelope.kind.as_str() {
            "store-message" | "worker-message" | "user-message" => {
                let turn = ChatTurn::from_envelope(&envelope).map_err(|err| {
                    WorkerError::InvalidPayload(format!(
                        "Invalid LLM message payload structure: {err}"
                    ))
                })?;
                let capacity = ctx
                    .config()
                    .get_usize(CACHE_CAPACITY_KEY)
                    .unwrap_or(DEFAULT_CAPACITY)
                    .max(1);
                let cached = self.store(turn, capacity);
                debug!(worker = %self.name, cached, "message cached");
                Ok(Reply::Response(json!({
                    "status": "Message stored successfully.",
                    "cached": cached,
                })))
            }
            "get-messages" => {
                let limit = envelope
                    .payload
                    .as_ref()
                    .and_then(|payload| payload.get("limit"))
                    .and_then(Value::as_u64)
                    .and_then(|raw| usize::try_from(raw).ok());
                let turns = self.newest(limit);
                Ok(Reply::Response(Value::Array(
                    turns.iter().map(ChatTurn::to_value).collect(),
                )))
            }
            _ => Ok(Reply::Unhandled),
        }
    }
}
