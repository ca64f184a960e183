//! Step definitions for question-answering scenarios.

mod given;
mod then;
mod when;
pub mod world;
