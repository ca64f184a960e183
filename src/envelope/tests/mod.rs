//! Unit tests for the envelope wire model.
