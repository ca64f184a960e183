//! In-memory worker directory.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::directory::{DirectoryResult, KnownWorker, WorkerDirectory};
use crate::envelope::WorkerName;
use crate::worker::WorkerConfig;

/// Thread-safe in-memory worker directory.
///
/// Entries keep the `updated_at` they were seeded with; persisting a patch
/// merges the configuration only.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkerDirectory {
    state: Arc<RwLock<BTreeMap<WorkerName, KnownWorker>>>,
}

impl InMemoryWorkerDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a worker entry, returning the directory.
    #[must_use]
    pub fn with_worker(self, worker: KnownWorker) -> Self {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(worker.name.clone(), worker);
        self
    }

    /// Returns the saved configuration of `name`.
    #[must_use]
    pub fn config_of(&self, name: &WorkerName) -> Option<WorkerConfig> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .and_then(|worker| worker.config.clone())
    }

    #[cfg(test)]
    pub(crate) fn poison_lock(&self) {
        let state = Arc::clone(&self.state);
        std::thread::spawn(move || {
            let _guard = state.write();
            panic!("poisoning the directory lock");
        })
        .join()
        .ok();
    }
}

#[async_trait]
impl WorkerDirectory for InMemoryWorkerDirectory {
    async fn list_workers(&self) -> DirectoryResult<Vec<KnownWorker>> {
        Ok(self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect())
    }

    async fn persist_config(&self, name: &WorkerName, patch: &WorkerConfig) -> DirectoryResult<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state
            .entry(name.clone())
            .or_insert_with(|| KnownWorker::new(name.clone()))
            .config
            .get_or_insert_with(WorkerConfig::new)
            .merge(patch);
        Ok(())
    }
}
