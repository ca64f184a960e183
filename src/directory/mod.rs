//! Worker discovery and configuration persistence.
//!
//! The router consults a [`WorkerDirectory`] at startup to learn the
//! configuration previously saved for each worker, and writes through it
//! when a `/config set` command changes a value. The module follows the
//! hexagonal layout:
//!
//! - Domain types in [`domain`]
//! - The port contract in [`ports`]
//! - In-memory and `PostgreSQL` implementations in [`adapters`]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use domain::KnownWorker;
pub use ports::{DirectoryError, DirectoryResult, WorkerDirectory};

#[cfg(test)]
pub use ports::MockWorkerDirectory;

#[cfg(test)]
mod tests;
