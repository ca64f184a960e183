//! Unit tests for channel transport.
