//! Courier: message routing and request correlation for cooperating workers.
//!
//! A single [`router`] connects independent workers and an external caller.
//! Everything travels as an [`envelope::Envelope`]; a worker that needs
//! another worker sends a `forward`, and the reply travels back through the
//! router to the original sender, matched by its hierarchical request id.
//!
//! # Architecture
//!
//! - [`envelope`]: wire model, typed payload views and chain identifiers
//! - [`transport`]: in-process channels and a JSON-lines stream bridge
//! - [`correlation`]: pending-reply table with per-request deadlines
//! - [`worker`]: the worker contract and the runtime driving one worker
//! - [`router`]: registry, forward table, delivery policy and `/config`
//! - [`directory`]: port and adapters persisting worker configuration
//! - [`orchestrator`]: the question-answering workflow
//! - [`workers`]: memory, generation and echo workers
//! - [`settings`] and [`telemetry`]: process configuration and logging

pub mod correlation;
pub mod directory;
pub mod envelope;
pub mod orchestrator;
pub mod router;
pub mod settings;
pub mod telemetry;
pub mod transport;
pub mod worker;
pub mod workers;
