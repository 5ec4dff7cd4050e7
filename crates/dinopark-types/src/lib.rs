//! Shared domain types for the DinoPark safety monitor.
//!
//! This crate defines the vocabulary every other crate speaks: zone codes
//! on the fixed park grid, diet classifications, the closed set of feed
//! event kinds delivered by the upstream park feed, and the persisted
//! dinosaur and maintenance records.
//!
//! It deliberately contains no I/O and no async code so it can be depended
//! on from anywhere (stores, HTTP handlers, tests) without pulling in a
//! runtime.

pub mod enums;
pub mod events;
pub mod ids;
pub mod records;
pub mod zone;

pub use enums::{DietClass, EventKind};
pub use events::{
    DecodedBatch, DinoAdded, DinoFed, DinoLocationUpdated, DinoRemoved, FeedEvent,
    MaintenancePerformed,
};
pub use ids::MaintenanceRecordId;
pub use records::{DEFAULT_DIGESTION_PERIOD_HOURS, Dinosaur, DinosaurIdentity, MaintenanceRecord};
pub use zone::{GRID_COLUMNS, GRID_ROWS, ZONE_COUNT, ZoneCode, ZoneCodeError};
