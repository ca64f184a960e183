//! Conversation memory.

mod store;
mod worker;

pub use store::{ContextOptions, ConversationMemory};
pub use worker::{HISTORY_SIZE_KEY, MemoryWorker};
