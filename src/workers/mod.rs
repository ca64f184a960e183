//! Domain workers run behind the router.
//!
//! - [`MemoryWorker`] keeps a bounded conversation history and builds the
//!   context the orchestrator turns into a prompt.
//! - [`GenerationWorker`] turns a prompt into an assistant turn through a
//!   [`TextGenerator`].
//! - [`EchoWorker`] answers a user message by rendering a template.
//! - [`CacheWorker`] keeps a bounded cache of the chat turns it receives.
//! - [`ContextWorker`] stores named context values set through typed
//!   envelopes or `/mcp` chat commands.

mod cache;
mod context;
mod echo;
pub mod generation;
pub mod memory;

pub use cache::{CACHE_CAPACITY_KEY, CacheWorker};
pub use context::{ContextCommand, ContextWorker};
pub use echo::EchoWorker;
pub use generation::{GenerationError, GenerationWorker, ScriptedGenerator, TextGenerator};
pub use memory::{ContextOptions, ConversationMemory, MemoryWorker};

#[cfg(test)]
mod tests;
