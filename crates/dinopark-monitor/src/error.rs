//! Error types for the monitor service binary.

use dinopark_core::config::ConfigError;
use dinopark_core::store::StoreError;
use dinopark_db::DbError;
use dinopark_observer::ServerError;

/// Errors that can occur while wiring up and running the service.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The database could not be reached or migrated.
    #[error("database error: {0}")]
    Db(#[from] DbError),

    /// The entity store failed during startup (e.g. zone seeding).
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The observer HTTP server failed to start or serve.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// The feed client could not be constructed.
    #[error("feed client error: {0}")]
    Feed(String),
}
