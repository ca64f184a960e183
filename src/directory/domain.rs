//! Directory domain types.

use crate::envelope::WorkerName;
use crate::worker::WorkerConfig;
use chrono::{DateTime, Utc};

/// A worker known to the directory.
#[derive(Debug, Clone, PartialEq)]
pub struct KnownWorker {
    /// Registered worker identity.
    pub name: WorkerName,
    /// Configuration saved for the worker, if any.
    pub config: Option<WorkerConfig>,
    /// When the saved configuration last changed, if recorded.
    pub updated_at: Option<DateTime<Utc>>,
}

impl KnownWorker {
    /// Creates an entry without saved configuration.
    #[must_use]
    pub const fn new(name: WorkerName) -> Self {
        Self {
            name,
            config: None,
            updated_at: None,
        }
    }

    /// Attaches saved configuration.
    #[must_use]
    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Records when the saved configuration last changed.
    #[must_use]
    pub const fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }
}
