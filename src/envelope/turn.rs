//! Chat turn payloads exchanged between the caller, the orchestrator and
//! language-model workers.

use super::{Envelope, EnvelopeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Author role of a chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// The human user.
    User,
    /// The assistant or model.
    Assistant,
    /// System instructions.
    System,
    /// Any other author label used by a worker.
    Other(String),
}

impl Role {
    /// Returns the wire representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Other(value) => value,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "user" => Self::User,
            "assistant" => Self::Assistant,
            "system" => Self::System,
            _ => Self::Other(value),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(value) => value,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `{role, content}` chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Author role.
    pub role: Role,
    /// Message text.
    pub content: String,
}

impl ChatTurn {
    /// Creates a chat turn.
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Validates a payload as a chat turn.
    ///
    /// Both `role` and `content` must be non-empty strings; additional keys
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::InvalidChatTurn`] describing the first missing
    /// or malformed field.
    pub fn from_payload(payload: &Value) -> Result<Self, EnvelopeError> {
        let object = payload
            .as_object()
            .ok_or_else(|| EnvelopeError::InvalidChatTurn("payload must be an object".to_owned()))?;

        let role = non_empty_string(object.get("role"), "role")?;
        let content = non_empty_string(object.get("content"), "content")?;

        Ok(Self::new(Role::from(role.to_owned()), content))
    }

    /// Validates the payload of an envelope as a chat turn.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MissingPayload`] when the envelope has no
    /// payload, otherwise the errors of [`ChatTurn::from_payload`].
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, EnvelopeError> {
        let payload = envelope
            .payload
            .as_ref()
            .ok_or_else(|| EnvelopeError::MissingPayload(envelope.kind.clone()))?;
        Self::from_payload(payload)
    }

    /// Returns whether the turn was authored by the user.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Converts the turn into a JSON payload.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "role": self.role.as_str(),
            "content": self.content,
        })
    }
}

fn non_empty_string<'a>(value: Option<&'a Value>, field: &str) -> Result<&'a str, EnvelopeError> {
    match value.and_then(Value::as_str) {
        Some(text) if !text.trim().is_empty() => Ok(text),
        Some(_) => Err(EnvelopeError::InvalidChatTurn(format!(
            "'{field}' must not be empty"
        ))),
        None => Err(EnvelopeError::InvalidChatTurn(format!(
            "'{field}' must be a string"
        ))),
    }
}
