//! `PostgreSQL` data layer for the DinoPark monitor.
//!
//! `PostgreSQL` is the single persistent store: dinosaur rows, the
//! per-zone latest-maintenance timestamps, and the append-only
//! maintenance history all live here. [`PgStore`] implements the
//! engine's [`EntityStore`](dinopark_core::store::EntityStore)
//! interface with native conditional upserts, so every merge is one
//! atomic statement and concurrent batch runs cannot lose updates.

pub mod error;
pub mod postgres;
pub mod store;

pub use error::DbError;
pub use postgres::{PostgresConfig, PostgresPool};
pub use store::PgStore;
