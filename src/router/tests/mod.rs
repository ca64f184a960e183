//! Unit tests for the router.
