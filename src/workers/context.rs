//! Keyed context store worker.
//!
//! Contexts are set, read, deleted and listed either through typed
//! envelopes (`set-context`, `get-context`, `delete-context`,
//! `list-contexts`) or through chat commands:
//!
//! ```text
//! /mcp set <key> <value...>
//! /mcp get <key>
//! /mcp delete <key>
//! /mcp list
//! /mcp help
//! ```

use crate::envelope::{ChatTurn, Envelope, EnvelopeKind, WorkerName};
use crate::worker::{Reply, Worker, WorkerContext, WorkerError, WorkerResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use tracing::debug;

const DEFAULT_NAME: &str = "context";
const COMMAND_PREFIX: &str = "/mcp";
const PROTOCOL_VERSION: &str = "1.0";
const AGENT_USER: &str = "MCP Agent";
const AGENT_ROLE: &str = "mcp";

/// A parsed `/mcp` chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextCommand {
    /// Lowercased command word.
    pub command: String,
    /// First argument, if any.
    pub key: Option<String>,
    /// Remainder of the line after the key, if any.
    pub value: Option<String>,
}

impl ContextCommand {
    /// Parses `/mcp <command> [key] [value...]`; the prefix is
    /// case-insensitive.
    ///
    /// Returns `None` when `text` is not a context command.
    ///
    /// ```
    /// use courier::workers::ContextCommand;
    ///
    /// let parsed = ContextCommand::parse("/MCP set topic rust ownership").expect("command");
    /// assert_eq!(parsed.command, "set");
    /// assert_eq!(parsed.key.as_deref(), Some("topic"));
    /// assert_eq!(parsed.value.as_deref(), Some("rust ownership"));
    /// assert!(ContextCommand::parse("/mcpset").is_none());
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        let prefix = trimmed.get(..COMMAND_PREFIX.len())?;
        if !prefix.eq_ignore_ascii_case(COMMAND_PREFIX) {
            return None;
        }
        let rest = trimmed.get(COMMAND_PREFIX.len()..)?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }

        let (command, after_command) = split_token(rest);
        if command.is_empty() || !command.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return None;
        }
        let (key, value) = split_token(after_command);
        Some(Self {
            command: command.to_lowercase(),
            key: non_empty(key),
            value: non_empty(value),
        })
    }
}

fn split_token(text: &str) -> (&str, &str) {
    let trimmed = text.trim_start();
    trimmed
        .split_once(char::is_whitespace)
        .map_or((trimmed, ""), |(head, tail)| (head, tail.trim()))
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_owned())
}

#[derive(Debug, Deserialize)]
struct KeyQuery {
    key: String,
}

#[derive(Debug, Deserialize)]
struct SetContext {
    key: String,
    value: Value,
}

/// In-memory store of named context values.
#[derive(Debug)]
pub struct ContextWorker {
    name: WorkerName,
    contexts: Mutex<BTreeMap<String, Value>>,
}

impl ContextWorker {
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
            contexts: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the stored context keys in order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Value>> {
        self.contexts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle_typed(&self, kind: &str, payload: &Value) -> WorkerResult<Option<Value>> {
        match kind {
            "set-context" => {
                let request: SetContext = decode(payload, kind)?;
                let key = required_key(request.key)?;
                if request.value.is_null() {
                    return Err(WorkerError::InvalidPayload(
                        "set-context requires a non-null value".to_owned(),
                    ));
                }
                self.lock().insert(key.clone(), request.value);
                Ok(Some(json!({ "status": "context-set", "key": key })))
            }
            "get-context" => {
                let key = required_key(decode::<KeyQuery>(payload, kind)?.key)?;
                let value = self.lock().get(&key).cloned().ok_or_else(|| not_found(&key))?;
                Ok(Some(json!({ "key": key, "value": value })))
            }
            "delete-context" => {
                let key = required_key(decode::<KeyQuery>(payload, kind)?.key)?;
                self.lock().remove(&key).ok_or_else(|| not_found(&key))?;
                Ok(Some(json!({ "status": "context-deleted", "key": key })))
            }
            "list-contexts" => Ok(Some(json!({ "keys": self.keys() }))),
            _ => Ok(None),
        }
    }

    fn run_command(&self, command: &ContextCommand) -> String {
        match (
            command.command.as_str(),
            command.key.as_deref(),
            command.value.as_deref(),
        ) {
            ("set", Some(key), Some(value)) => {
                self.lock()
                    .insert(key.to_owned(), Value::String(value.to_owned()));
                format!("Context '{key}' set successfully.")
            }
            ("set", _, _) => "Error: MCP set command requires both key and value.".to_owned(),
            ("get", Some(key), _) => match self.lock().get(key) {
                Some(value) => format!("{key}: {}", display(value)),
                None => format!("Context '{key}' not found."),
            },
            ("get", None, _) => "Error: MCP get command requires a key.".to_owned(),
            ("delete", Some(key), _) => match self.lock().remove(key) {
                Some(_) => format!("Context '{key}' deleted successfully."),
                None => format!("Context '{key}' not found."),
            },
            ("delete", None, _) => "Error: MCP delete command requires a key.".to_owned(),
            ("list", _, _) => {
                let keys = self.keys();
                if keys.is_empty() {
                    "No contexts available.".to_owned()
                } else {
                    format!("Available contexts:\n{}", keys.join("\n"))
                }
            }
            ("help", _, _) => help_text(),
            (other, _, _) => {
                format!("Unknown MCP command: {other}. Type /mcp help for available commands.")
            }
        }
    }
}

impl Default for ContextWorker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Worker for ContextWorker {
    fn name(&self) -> &WorkerName {
        &self.name
    }

    async fn handle(&self, envelope: Envelope, _ctx: &WorkerContext) -> WorkerResult<Reply> {
        if envelope.kind == EnvelopeKind::UserMessage {
            let turn = ChatTurn::from_envelope(&envelope)?;
            let content = match ContextCommand::parse(&turn.content) {
                Some(command) => {
                    debug!(worker = %self.name, command = %command.command, "context command");
                    self.run_command(&command)
                }
                None => format!("MCP received: {}", turn.content),
            };
            return Ok(Reply::Response(agent_reply(&content)));
        }

        let empty = Value::Null;
        let payload = envelope.payload.as_ref().unwrap_or(&empty);
        Ok(self
            .handle_typed(envelope.kind.as_str(), payload)?
            .map_or(Reply::Unhandled, Reply::Response))
    }
}

fn agent_reply(content: &str) -> Value {
    json!({ "role": AGENT_ROLE, "user": AGENT_USER, "content": content })
}

fn help_text() -> String {
    format!(
        "MCP v{PROTOCOL_VERSION} Help:\n\
         /mcp set <key> <value> - Set a context\n\
         /mcp get <key> - Get a context value\n\
         /mcp delete <key> - Delete a context\n\
         /mcp list - List all available contexts\n\
         /mcp help - Show this help message"
    )
}

fn display(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_owned)
}

fn required_key(key: String) -> WorkerResult<String> {
    if key.trim().is_empty() {
        return Err(WorkerError::InvalidPayload("context key must not be empty".to_owned()));
    }
    Ok(key)
}

fn not_found(key: &str) -> WorkerError {
    WorkerError::failed(format!("Context '{key}' not found."))
}

fn decode<T: for<'de> Deserialize<'de>>(payload: &Value, kind: &str) -> WorkerResult<T> {
    T::deserialize(payload)
        .map_err(|err| WorkerError::InvalidPayload(format!("invalid payload for {kind}: {err}")))
}
