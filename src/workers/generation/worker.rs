//! Worker answering prompts with generated text.

use super::TextGenerator;
use crate::envelope::{ChatTurn, Envelope, EnvelopeKind, WorkerName};
use crate::worker::{Reply, Worker, WorkerContext, WorkerError, WorkerResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_NAME: &str = "generation";

/// Turns a chat-turn prompt into an assistant turn.
///
/// Accepts `generate-prompt` from the orchestrator and `user-message` when
/// the router fans user messages out directly.
pub struct GenerationWorker {
    name: WorkerName,
    generator: Arc<dyn TextGenerator>,
}

impl GenerationWorker {
    /// Creates the worker under its canonical name.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self::named(WorkerName::from_static(DEFAULT_NAME), generator)
    }

    /// Creates the worker under `name`.
    #[must_use]
    pub fn named(name: WorkerName, generator: Arc<dyn TextGenerator>) -> Self {
        Self { name, generator }
    }
}

impl std::fmt::Debug for GenerationWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationWorker")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Worker for GenerationWorker {
    fn name(&self) -> &WorkerName {
        &self.name
    }

    async fn handle(&self, envelope: Envelope, _ctx: &WorkerContext) -> WorkerResult<Reply> {
        let accepted = envelope.kind == EnvelopeKind::UserMessage
            || envelope.kind.as_str() == "generate-prompt";
        if !accepted {
            return Ok(Reply::Unhandled);
        }
        let prompt = ChatTurn::from_envelope(&envelope)?;
        debug!(worker = %self.name, prompt_len = prompt.content.len(), "generating reply");

        let text = self.generator.generate(&prompt).await?;
        if text.trim().is_empty() {
            return Err(WorkerError::failed("generator returned empty content"));
        }
        Ok(Reply::Response(ChatTurn::assistant(text).to_value()))
    }
}
