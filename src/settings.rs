//! Process-level settings.
//!
//! Settings are read from a JSON document. Every field has a default, so an
//! empty object (or no file at all) yields a working single-process setup:
//!
//! ```json
//! {
//!   "router": { "policy": { "mode": "orchestrator", "worker": "orchestrator" } },
//!   "correlation": { "timeout_ms": 30000 },
//!   "log_filter": "info",
//!   "workers": { "memory": { "history_size": 20 } }
//! }
//! ```

use crate::correlation::CorrelationSettings;
use crate::directory::KnownWorker;
use crate::directory::adapters::memory::InMemoryWorkerDirectory;
use crate::envelope::{EnvelopeError, WorkerName};
use crate::router::RouterSettings;
use crate::worker::WorkerConfig;
use camino::Utf8Path;
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_LOG_FILTER: &str = "info";

/// Errors raised while loading settings.
#[derive(Debug, Clone, Error)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings from {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// Underlying I/O failure.
        source: Arc<std::io::Error>,
    },

    /// The settings document is not valid.
    #[error("failed to parse settings: {0}")]
    Parse(String),

    /// A worker seed uses an invalid worker name.
    #[error("invalid worker name in settings: {0}")]
    InvalidWorker(#[from] EnvelopeError),
}

/// Complete settings of a courier process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CourierSettings {
    /// Router behaviour.
    pub router: RouterSettings,
    /// Reply deadline for correlated requests.
    pub correlation: CorrelationSettings,
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    pub log_filter: String,
    /// Configuration pushed to workers when they register, keyed by worker
    /// name.
    pub workers: BTreeMap<String, WorkerConfig>,
    /// `PostgreSQL` URL of the worker directory; configuration is kept in
    /// memory when absent.
    pub database_url: Option<String>,
}

impl Default for CourierSettings {
    fn default() -> Self {
        Self {
            router: RouterSettings::default(),
            correlation: CorrelationSettings::default(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            workers: BTreeMap::new(),
            database_url: None,
        }
    }
}

impl CourierSettings {
    /// Parses settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Parse`] when the document is not valid JSON
    /// or has fields of the wrong type.
    pub fn from_json(raw: &str) -> Result<Self, SettingsError> {
        serde_json::from_str(raw).map_err(|err| SettingsError::Parse(err.to_string()))
    }

    /// Reads settings from the JSON file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Read`] when the file cannot be opened and
    /// [`SettingsError::Parse`] when its contents are invalid.
    pub fn load(path: &Utf8Path) -> Result<Self, SettingsError> {
        let read_error = |source: std::io::Error| SettingsError::Read {
            path: path.to_string(),
            source: Arc::new(source),
        };
        let file_name = path
            .file_name()
            .ok_or_else(|| read_error(std::io::Error::other("path must include a file name")))?;
        let parent = path
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(read_error)?;
        let contents = dir.read_to_string(file_name).map_err(read_error)?;
        Self::from_json(&contents)
    }

    /// Returns the worker seeds as directory entries.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidWorker`] when a seed key is not a
    /// valid worker name.
    pub fn known_workers(&self) -> Result<Vec<KnownWorker>, SettingsError> {
        self.workers
            .iter()
            .map(|(name, config)| {
                Ok(KnownWorker::new(WorkerName::new(name.as_str())?).with_config(config.clone()))
            })
            .collect()
    }

    /// Builds an in-memory directory holding the worker seeds.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidWorker`] when a seed key is not a
    /// valid worker name.
    pub fn seed_directory(&self) -> Result<InMemoryWorkerDirectory, SettingsError> {
        Ok(self
            .known_workers()?
            .into_iter()
            .fold(InMemoryWorkerDirectory::new(), InMemoryWorkerDirectory::with_worker))
    }
}
