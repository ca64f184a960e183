//! Conversation context exchanged between the memory worker and the
//! orchestrator.

use super::{ChatTurn, EnvelopeError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Context assembled for one user message.
///
/// Both lists may be empty; a payload without one of the keys decodes to an
/// empty list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextBundle {
    /// Most recent turns, oldest first.
    pub recent_messages: Vec<ChatTurn>,
    /// Earlier turns related to the current message, best match first.
    pub relevant_memories: Vec<ChatTurn>,
}

impl ContextBundle {
    /// Decodes a context bundle payload.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Malformed`] when the payload is not an object
    /// of turn lists.
    pub fn from_payload(payload: &Value) -> Result<Self, EnvelopeError> {
        if !payload.is_object() {
            return Err(EnvelopeError::Malformed(
                "context bundle must be a JSON object".to_owned(),
            ));
        }
        Self::deserialize(payload).map_err(|err| EnvelopeError::malformed(&err))
    }

    /// Returns whether both lists are empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.recent_messages.is_empty() && self.relevant_memories.is_empty()
    }

    /// Converts the bundle into a JSON payload.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "recentMessages": self.recent_messages.iter().map(ChatTurn::to_value).collect::<Vec<_>>(),
            "relevantMemories": self.relevant_memories.iter().map(ChatTurn::to_value).collect::<Vec<_>>(),
        })
    }
}
