//! Unit tests for the QnA orchestrator.
