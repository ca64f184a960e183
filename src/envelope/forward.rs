//! Typed view over the payload of a `forward` envelope.

use super::{ChainId, Envelope, EnvelopeError, EnvelopeKind, WorkerName};
use serde_json::{Value, json};

/// A router-mediated request: deliver `message` to `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardRequest {
    /// Worker the inner envelope is addressed to.
    pub target: WorkerName,
    /// Envelope delivered verbatim to the target.
    pub message: Envelope,
}

impl ForwardRequest {
    /// Creates a forward instruction.
    #[must_use]
    pub const fn new(target: WorkerName, message: Envelope) -> Self {
        Self { target, message }
    }

    /// Returns the request identifier shared by the outer and inner
    /// envelopes.
    #[must_use]
    pub const fn request_id(&self) -> Option<&ChainId> {
        self.message.request_id.as_ref()
    }

    /// Extracts and validates the forward instruction carried by `envelope`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::MissingPayload`] when the envelope has no
    /// payload, [`EnvelopeError::InvalidForward`] when `target` or `message`
    /// is missing or malformed, [`EnvelopeError::MissingRequestId`] when
    /// either request id is absent, and
    /// [`EnvelopeError::RequestIdMismatch`] when the two ids differ.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self, EnvelopeError> {
        let payload = envelope
            .payload
            .as_ref()
            .ok_or_else(|| EnvelopeError::MissingPayload(EnvelopeKind::Forward))?;

        let raw_target = payload
            .get("target")
            .and_then(Value::as_str)
            .ok_or_else(|| EnvelopeError::InvalidForward("'target' must be a string".to_owned()))?;
        let target = WorkerName::new(raw_target)?;

        let raw_message = payload
            .get("message")
            .filter(|value| value.is_object())
            .ok_or_else(|| {
                EnvelopeError::InvalidForward("'message' must be an envelope object".to_owned())
            })?;
        let message: Envelope = serde_json::from_value(raw_message.clone())
            .map_err(|err| EnvelopeError::InvalidForward(err.to_string()))?;
        message.validate()?;

        let outer = envelope
            .request_id
            .as_ref()
            .ok_or(EnvelopeError::MissingRequestId("forward"))?;
        let inner = message
            .request_id
            .as_ref()
            .ok_or(EnvelopeError::MissingRequestId("inner message"))?;
        if outer != inner {
            return Err(EnvelopeError::RequestIdMismatch {
                outer: outer.clone(),
                inner: inner.clone(),
            });
        }

        Ok(Self { target, message })
    }

    /// Wraps the instruction in a `forward` envelope sent by `sender`.
    ///
    /// The outer envelope takes the inner envelope's request id.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Malformed`] if the inner envelope cannot be
    /// serialised.
    pub fn into_envelope(self, sender: WorkerName) -> Result<Envelope, EnvelopeError> {
        let request_id = self.message.request_id.clone();
        let message =
            serde_json::to_value(&self.message).map_err(|err| EnvelopeError::malformed(&err))?;
        Ok(Envelope::new(EnvelopeKind::Forward, sender)
            .with_payload(json!({ "target": self.target, "message": message }))
            .with_optional_request_id(request_id))
    }
}
