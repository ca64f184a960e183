//! Port for downstream text generation.

use crate::envelope::ChatTurn;
use crate::worker::WorkerError;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for text generation.
pub type GenerationResult<T> = Result<T, GenerationError>;

/// Produces the assistant's reply to a prompt.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generates reply text for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] when the backend refuses or fails.
    async fn generate(&self, prompt: &ChatTurn) -> GenerationResult<String>;
}

/// Errors returned by text generators.
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    /// The backend declined the prompt.
    #[error("generation rejected: {0}")]
    Rejected(String),

    /// The backend could not be reached or failed.
    #[error("generation backend failed: {0}")]
    Backend(Arc<dyn std::error::Error + Send + Sync>),
}

impl GenerationError {
    /// Wraps a backend error.
    #[must_use]
    pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Backend(Arc::new(err))
    }
}

impl From<GenerationError> for WorkerError {
    fn from(err: GenerationError) -> Self {
        Self::failed(err.to_string())
    }
}
