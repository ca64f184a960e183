//! The envelope value exchanged over every channel.

use super::{ChainId, EnvelopeError, EnvelopeKind, WorkerName};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Structured unit of communication between courier participants.
///
/// ```
/// use courier::envelope::{ChainId, Envelope, EnvelopeKind, WorkerName};
///
/// let name = WorkerName::new("memory").expect("valid name");
/// let id = ChainId::parse("user-1:task-a").expect("valid id");
/// let reply = Envelope::new(EnvelopeKind::Response, name)
///     .with_payload(serde_json::json!({"status": "ok"}))
///     .with_request_id(id);
///
/// let json = reply.to_json().expect("serialisable");
/// assert!(json.contains(r#""requestId":"user-1:task-a""#));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Message type tag.
    #[serde(rename = "type")]
    pub kind: EnvelopeKind,
    /// Identity of the sending worker.
    pub name: WorkerName,
    /// Type-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    /// Chain identifier used to correlate replies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<ChainId>,
    /// Human-readable failure description for `error` envelopes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Envelope {
    /// Creates an envelope without payload or request identifier.
    #[must_use]
    pub const fn new(kind: EnvelopeKind, name: WorkerName) -> Self {
        Self {
            kind,
            name,
            payload: None,
            request_id: None,
            error: None,
        }
    }

    /// Creates an `error` envelope.
    ///
    /// The message is carried both in the `error` field and as
    /// `payload.error`.
    #[must_use]
    pub fn failure(
        name: WorkerName,
        message: impl Into<String>,
        request_id: Option<ChainId>,
    ) -> Self {
        let text = message.into();
        Self {
            kind: EnvelopeKind::Error,
            name,
            payload: Some(json!({ "error": text })),
            request_id,
            error: Some(text),
        }
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Sets the request identifier.
    #[must_use]
    pub fn with_request_id(mut self, request_id: ChainId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Sets or clears the request identifier.
    #[must_use]
    pub fn with_optional_request_id(mut self, request_id: Option<ChainId>) -> Self {
        self.request_id = request_id;
        self
    }

    /// Replaces the sender identity.
    #[must_use]
    pub fn stamped(mut self, name: &WorkerName) -> Self {
        self.name = name.clone();
        self
    }

    /// Returns the failure description of an `error` envelope.
    ///
    /// Prefers the `error` field and falls back to a string `payload.error`
    /// or a string payload.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        if let Some(message) = &self.error {
            return Some(message.clone());
        }
        match self.payload.as_ref()? {
            Value::String(text) => Some(text.clone()),
            Value::Object(map) => map.get("error").and_then(Value::as_str).map(str::to_owned),
            _ => None,
        }
    }

    /// Checks the structural invariants of the envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MissingPayload`] when the type requires a
    /// payload that is absent, or [`EnvelopeError::Malformed`] for an empty
    /// type tag.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.kind.as_str().is_empty() {
            return Err(EnvelopeError::Malformed("type must not be empty".to_owned()));
        }
        if self.kind.requires_payload() && self.payload.is_none() {
            return Err(EnvelopeError::MissingPayload(self.kind.clone()));
        }
        Ok(())
    }

    /// Serialises the envelope to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Malformed`] if serialisation fails.
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(|err| EnvelopeError::malformed(&err))
    }

    /// Parses and validates an envelope from its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Malformed`] when the JSON is invalid or a
    /// required field is missing, or the errors of [`Envelope::validate`].
    pub fn from_json(raw: &str) -> Result<Self, EnvelopeError> {
        let envelope: Self =
            serde_json::from_str(raw).map_err(|err| EnvelopeError::malformed(&err))?;
        envelope.validate()?;
        Ok(envelope)
    }
}
