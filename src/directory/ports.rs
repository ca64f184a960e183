//! Port contract for worker discovery.

use super::KnownWorker;
use crate::envelope::WorkerName;
use crate::worker::WorkerConfig;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Source of known workers and their saved configuration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkerDirectory: Send + Sync {
    /// Returns every known worker with its saved configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the backing store cannot be read.
    async fn list_workers(&self) -> DirectoryResult<Vec<KnownWorker>>;

    /// Merges `patch` into the saved configuration of `name`, creating the
    /// entry when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`DirectoryError`] when the backing store rejects the write.
    async fn persist_config(&self, name: &WorkerName, patch: &WorkerConfig) -> DirectoryResult<()>;
}

/// Errors returned by directory implementations.
#[derive(Debug, Clone, Error)]
pub enum DirectoryError {
    /// Persisted data could not be reconstructed into domain types.
    #[error("invalid persisted data: {0}")]
    InvalidPersistedData(Arc<dyn std::error::Error + Send + Sync>),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl DirectoryError {
    /// Wraps a data-quality or deserialization error from persisted rows.
    pub fn invalid_persisted_data(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::InvalidPersistedData(Arc::new(err))
    }

    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
