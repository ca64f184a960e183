//! Text generation behind a port.

mod adapters;
mod ports;
mod worker;

pub use adapters::ScriptedGenerator;
#[cfg(test)]
pub use ports::MockTextGenerator;
pub use ports::{GenerationError, GenerationResult, TextGenerator};
pub use worker::GenerationWorker;
