//! `PostgreSQL` adapter for the worker directory.

pub(crate) mod models;
pub(crate) mod repository;
mod schema;

pub use repository::{DirectoryPgPool, PostgresWorkerDirectory};
