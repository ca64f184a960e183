//! Diesel row models for worker configuration persistence.

use super::schema::worker_configs;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Query result row for saved worker configuration.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = worker_configs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WorkerConfigRow {
    /// Worker identity.
    pub name: String,
    /// Configuration object.
    pub config: Value,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Insert model for saved worker configuration.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = worker_configs)]
pub struct NewWorkerConfigRow {
    /// Worker identity.
    pub name: String,
    /// Configuration object.
    pub config: Value,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}
