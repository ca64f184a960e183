//! `PostgreSQL` implementation of the worker directory.

use super::{
    models::{NewWorkerConfigRow, WorkerConfigRow},
    schema::worker_configs,
};
use crate::directory::{DirectoryError, DirectoryResult, KnownWorker, WorkerDirectory};
use crate::envelope::WorkerName;
use crate::worker::WorkerConfig;
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::{Clock, DefaultClock};
use std::sync::Arc;

/// `PostgreSQL` connection pool type used by the directory adapter.
pub type DirectoryPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed worker directory.
#[derive(Clone)]
pub struct PostgresWorkerDirectory {
    pool: DirectoryPgPool,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl PostgresWorkerDirectory {
    /// Creates a directory from a connection pool, stamping updates with the
    /// system clock.
    #[must_use]
    pub fn new(pool: DirectoryPgPool) -> Self {
        Self::with_clock(pool, Arc::new(DefaultClock))
    }

    /// Creates a directory stamping updates with `clock`.
    #[must_use]
    pub fn with_clock(pool: DirectoryPgPool, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { pool, clock }
    }

    async fn run_blocking<F, T>(&self, f: F) -> DirectoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> DirectoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(DirectoryError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(DirectoryError::persistence)?
    }
}

impl std::fmt::Debug for PostgresWorkerDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresWorkerDirectory")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl WorkerDirectory for PostgresWorkerDirectory {
    async fn list_workers(&self) -> DirectoryResult<Vec<KnownWorker>> {
        self.run_blocking(move |connection| {
            let rows = worker_configs::table
                .order(worker_configs::name.asc())
                .select(WorkerConfigRow::as_select())
                .load::<WorkerConfigRow>(connection)
                .map_err(DirectoryError::persistence)?;
            rows.into_iter().map(row_to_known_worker).collect()
        })
        .await
    }

    async fn persist_config(&self, name: &WorkerName, patch: &WorkerConfig) -> DirectoryResult<()> {
        let name_str = name.as_str().to_owned();
        let owned_patch = patch.clone();
        let updated_at = self.clock.utc();

        self.run_blocking(move |connection| {
            connection.transaction::<_, DirectoryError, _>(|tx| {
                let existing = worker_configs::table
                    .filter(worker_configs::name.eq(&name_str))
                    .select(worker_configs::config)
                    .for_update()
                    .first::<serde_json::Value>(tx)
                    .optional()
                    .map_err(DirectoryError::persistence)?;

                let merged = merge_stored(existing.as_ref(), &owned_patch)?;
                let row = NewWorkerConfigRow {
                    name: name_str.clone(),
                    config: merged.to_value(),
                    updated_at,
                };

                diesel::insert_into(worker_configs::table)
                    .values(&row)
                    .on_conflict(worker_configs::name)
                    .do_update()
                    .set((
                        worker_configs::config.eq(&row.config),
                        worker_configs::updated_at.eq(row.updated_at),
                    ))
                    .execute(tx)
                    .map_err(DirectoryError::persistence)?;
                Ok(())
            })
        })
        .await
    }
}

impl From<diesel::result::Error> for DirectoryError {
    fn from(err: diesel::result::Error) -> Self {
        Self::persistence(err)
    }
}

/// Merges `patch` over the stored configuration object.
pub(crate) fn merge_stored(
    stored: Option<&serde_json::Value>,
    patch: &WorkerConfig,
) -> DirectoryResult<WorkerConfig> {
    let mut config = match stored {
        Some(value) => WorkerConfig::from_value(value).ok_or_else(|| {
            DirectoryError::invalid_persisted_data(std::io::Error::other(
                "stored worker config is not a JSON object",
            ))
        })?,
        None => WorkerConfig::new(),
    };
    config.merge(patch);
    Ok(config)
}

pub(crate) fn row_to_known_worker(row: WorkerConfigRow) -> DirectoryResult<KnownWorker> {
    let WorkerConfigRow {
        name: raw_name,
        config: raw_config,
        updated_at,
    } = row;
    let name = WorkerName::new(raw_name).map_err(DirectoryError::invalid_persisted_data)?;
    let config = WorkerConfig::from_value(&raw_config).ok_or_else(|| {
        DirectoryError::invalid_persisted_data(std::io::Error::other(format!(
            "stored config for '{name}' is not a JSON object"
        )))
    })?;
    Ok(KnownWorker::new(name)
        .with_config(config)
        .with_updated_at(updated_at))
}
