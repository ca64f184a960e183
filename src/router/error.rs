//! Router error types.

use crate::directory::DirectoryError;
use thiserror::Error;

/// Errors returned by router handles and startup.
#[derive(Debug, Clone, Error)]
pub enum RouterError {
    /// The router event loop is no longer running.
    #[error("router has stopped")]
    Stopped,

    /// Saved worker configuration could not be loaded at startup.
    #[error("failed to load worker directory: {0}")]
    Directory(#[from] DirectoryError),
}
