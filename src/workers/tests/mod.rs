//! Unit tests for the domain workers.

mod memory_worker_tests;
mod support;
