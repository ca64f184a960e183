//! Envelope type tag.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The `type` tag of an envelope.
///
/// The known tags are the ones the core interprets. Any other string is a
/// worker-specific message type (for example `build-context`) and survives a
/// round trip through [`EnvelopeKind::Custom`] unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnvelopeKind {
    /// A connection declares the worker name it serves.
    Register,
    /// A chat turn from the external caller.
    UserMessage,
    /// A router-mediated request addressed to a named worker.
    Forward,
    /// A successful reply.
    Response,
    /// A successful reply carrying a computed result.
    Result,
    /// A failed reply.
    Error,
    /// An informational status update.
    Status,
    /// Merge a configuration patch into the receiving worker.
    SetConfig,
    /// Read one configuration value or the full configuration.
    GetConfig,
    /// A worker-specific command carried in the payload.
    Command,
    /// A terminal envelope normalised for the external caller.
    AgentMessage,
    /// Any other worker-specific type.
    Custom(String),
}

impl EnvelopeKind {
    /// Returns the wire representation of the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Register => "register",
            Self::UserMessage => "user-message",
            Self::Forward => "forward",
            Self::Response => "response",
            Self::Result => "result",
            Self::Error => "error",
            Self::Status => "status",
            Self::SetConfig => "set-config",
            Self::GetConfig => "get-config",
            Self::Command => "command",
            Self::AgentMessage => "agent-message",
            Self::Custom(value) => value,
        }
    }

    /// Creates a worker-specific type tag.
    ///
    /// Known tag names map to their dedicated variant.
    #[must_use]
    pub fn custom(value: impl Into<String>) -> Self {
        Self::from(value.into())
    }

    /// Returns whether the tag settles a correlated request
    /// (`response`, `result` or `error`).
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        matches!(self, Self::Response | Self::Result | Self::Error)
    }

    /// Returns whether the router delivers the tag to the external caller when
    /// it matches no pending forward.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Response | Self::Result | Self::Error | Self::Status
        )
    }

    /// Returns whether an envelope of this type must carry a payload.
    #[must_use]
    pub const fn requires_payload(&self) -> bool {
        matches!(self, Self::UserMessage | Self::Forward | Self::SetConfig)
    }
}

impl From<String> for EnvelopeKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "register" => Self::Register,
            "user-message" => Self::UserMessage,
            "forward" => Self::Forward,
            "response" => Self::Response,
            "result" => Self::Result,
            "error" => Self::Error,
            "status" => Self::Status,
            "set-config" => Self::SetConfig,
            "get-config" => Self::GetConfig,
            "command" => Self::Command,
            "agent-message" => Self::AgentMessage,
            _ => Self::Custom(value),
        }
    }
}

impl From<&str> for EnvelopeKind {
    fn from(value: &str) -> Self {
        Self::from(value.to_owned())
    }
}

impl From<EnvelopeKind> for String {
    fn from(kind: EnvelopeKind) -> Self {
        match kind {
            EnvelopeKind::Custom(value) => value,
            other => other.as_str().to_owned(),
        }
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
