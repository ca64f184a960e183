//! Unit tests for request correlation.

mod map_tests;
