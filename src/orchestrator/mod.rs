//! Question-answering workflow coordinator.
//!
//! [`QnaOrchestrator`] answers a user message by driving the memory and
//! generation workers through correlated forwards: it records the message,
//! asks memory for context, composes a prompt, asks the generation worker for
//! an answer, records the answer and finally replies to the caller. Each
//! workflow runs on its own task so the orchestrator keeps receiving the
//! replies the workflow awaits.

mod flow;
mod prompt;

pub use flow::{GENERATION_WORKER_KEY, MEMORY_WORKER_KEY, QnaOrchestrator};
pub use prompt::compose_prompt;

#[cfg(test)]
mod tests;
