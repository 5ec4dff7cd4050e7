//! Error types for the data layer.
//!
//! Pool construction and migrations report [`DbError`]. Store
//! operations behind the engine's `EntityStore` interface instead map
//! failures into the engine's own
//! [`StoreError`](dinopark_core::store::StoreError) so the core crate
//! never depends on [`sqlx`] types.

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
