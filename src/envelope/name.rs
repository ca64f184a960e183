//! Validated worker name type.

use super::EnvelopeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum length for a worker name.
const MAX_NAME_LENGTH: usize = 100;

/// Identity of a worker as declared when it registers with the router.
///
/// Names are trimmed but otherwise kept as declared (`orchestrator`,
/// `memory`, `QnAFlowWorker`). Only characters in `[A-Za-z0-9_.-]` are
/// accepted so names survive the space-separated `/config` syntax.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkerName(String);

impl WorkerName {
    /// Creates a validated worker name.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::EmptyWorkerName`] when the value is empty
    /// after trimming, [`EnvelopeError::WorkerNameTooLong`] when it exceeds
    /// 100 characters, or [`EnvelopeError::InvalidWorkerName`] when it
    /// contains characters outside `[A-Za-z0-9_.-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, EnvelopeError> {
        let raw = value.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(EnvelopeError::EmptyWorkerName);
        }

        if trimmed.len() > MAX_NAME_LENGTH {
            return Err(EnvelopeError::WorkerNameTooLong(raw));
        }

        let is_valid = trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !is_valid {
            return Err(EnvelopeError::InvalidWorkerName(raw));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Creates a name from a compile-time constant known to be valid.
    pub(crate) fn from_static(value: &'static str) -> Self {
        debug_assert!(Self::new(value).is_ok(), "invalid static worker name {value}");
        Self(value.to_owned())
    }

    /// Returns the worker name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WorkerName {
    type Error = EnvelopeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for WorkerName {
    type Error = EnvelopeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkerName> for String {
    fn from(name: WorkerName) -> Self {
        name.0
    }
}

impl AsRef<str> for WorkerName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for WorkerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
