//! Diesel schema for worker configuration persistence.

diesel::table! {
    /// Saved worker configuration.
    worker_configs (name) {
        /// Worker identity.
        #[max_length = 100]
        name -> Varchar,
        /// Configuration object as JSONB.
        config -> Jsonb,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
