//! In-process generator.

use super::{GenerationError, GenerationResult, TextGenerator};
use crate::envelope::ChatTurn;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Generator replaying queued outcomes.
///
/// Once the queue is empty it echoes the prompt as `You said, "<prompt>"`.
/// Every prompt received is recorded.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    outcomes: Mutex<VecDeque<GenerationResult<String>>>,
    prompts: Mutex<Vec<ChatTurn>>,
}

impl ScriptedGenerator {
    /// Creates a generator with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful reply.
    #[must_use]
    pub fn with_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    /// Queues a rejection.
    #[must_use]
    pub fn with_rejection(self, reason: impl Into<String>) -> Self {
        self.push(Err(GenerationError::Rejected(reason.into())));
        self
    }

    /// Queues an outcome on a shared generator.
    pub fn push(&self, outcome: GenerationResult<String>) {
        self.outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(outcome);
    }

    /// Returns the prompts received so far.
    #[must_use]
    pub fn prompts(&self) -> Vec<ChatTurn> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &ChatTurn) -> GenerationResult<String> {
        self.prompts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(prompt.clone());
        let queued = self
            .outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        queued.unwrap_or_else(|| Ok(format!("You said, \"{}\"", prompt.content)))
    }
}
