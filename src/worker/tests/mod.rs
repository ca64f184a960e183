//! Unit tests for the worker runtime.
