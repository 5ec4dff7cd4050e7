//! Core engine of the DinoPark safety monitor.
//!
//! This crate owns the parts with real invariants:
//!
//! - [`store`] -- the entity-store interface the engine reconciles into,
//!   plus an in-memory implementation used by tests.
//! - [`reconcile`] -- applies one feed event as an idempotent,
//!   order-independent, field-scoped merge.
//! - [`safety`] -- derives the live zone-safety verdict and the
//!   maintenance-due flag.
//! - [`batch`] -- drives a whole event batch through the reconciler,
//!   counting successes and failures without ever aborting.
//! - [`poller`] -- the injectable polling component that periodically
//!   pulls the feed and submits batches, exposing its own status and
//!   counters.
//! - [`config`] -- typed service configuration loaded from YAML with
//!   environment overrides.
//!
//! Everything here is generic over the [`store::EntityStore`] trait, so
//! the same engine runs against PostgreSQL in production and the
//! in-memory store in tests.

pub mod batch;
pub mod config;
pub mod error;
pub mod poller;
pub mod reconcile;
pub mod safety;
pub mod store;

pub use batch::{BatchCoordinator, BatchOutcome};
pub use config::{ConfigError, MonitorConfig};
pub use error::ReconcileError;
pub use poller::{EventSource, Poller, PollerSnapshot, PollerState, PollerStatus, SourceError};
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use safety::{SafetyEvaluator, is_digesting, maintenance_due, zone_is_safe};
pub use store::{EntityStore, MemoryStore, StoreError};
