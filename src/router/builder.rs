//! Router construction.

use super::event_loop::RouterCore;
use super::{RouterError, RouterHandle, RouterSettings};
use crate::directory::WorkerDirectory;
use crate::envelope::WorkerName;
use crate::transport::{Endpoint, duplex};
use crate::worker::WorkerConfig;
use mockable::{Clock, DefaultClock};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Entry point for starting a router.
#[derive(Debug, Clone, Copy)]
pub struct Router;

impl Router {
    /// Starts building a router with `settings`.
    #[must_use]
    pub fn builder(settings: RouterSettings) -> RouterBuilder {
        RouterBuilder {
            settings,
            directory: None,
            clock: Arc::new(DefaultClock),
        }
    }
}

/// Builder for a router.
pub struct RouterBuilder {
    settings: RouterSettings,
    directory: Option<Arc<dyn WorkerDirectory>>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl RouterBuilder {
    /// Uses `directory` to restore and persist worker configuration.
    #[must_use]
    pub fn directory(mut self, directory: Arc<dyn WorkerDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Uses `clock` for registration and forward timestamps.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = clock;
        self
    }

    /// Loads saved configuration and starts the event loop.
    ///
    /// Returns the control handle and the caller's endpoint. The caller
    /// receives `agent-message` envelopes and router errors on it.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::Directory`] when saved configuration cannot be
    /// loaded.
    pub async fn spawn(self) -> Result<(RouterHandle, Endpoint), RouterError> {
        let Self {
            settings,
            directory,
            clock,
        } = self;

        let saved_configs = match &directory {
            Some(directory) => load_saved_configs(directory.as_ref()).await?,
            None => HashMap::new(),
        };
        info!(saved = saved_configs.len(), "loaded saved worker configuration");

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut core = RouterCore::new(settings, events_tx.clone(), saved_configs, directory, clock);
        let (router_end, caller_end) = duplex();
        core.attach(router_end, None);
        tokio::spawn(core.run(events_rx));

        Ok((RouterHandle::new(events_tx), caller_end))
    }
}

async fn load_saved_configs(
    directory: &dyn WorkerDirectory,
) -> Result<HashMap<WorkerName, WorkerConfig>, RouterError> {
    let workers = directory.list_workers().await?;
    Ok(workers
        .into_iter()
        .filter_map(|worker| worker.config.map(|config| (worker.name, config)))
        .filter(|(_, config)| !config.is_empty())
        .collect())
}
