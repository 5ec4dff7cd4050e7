//! Persisted record types: dinosaurs and maintenance history.
//!
//! A [`Dinosaur`] splits into two independently-updated field groups:
//!
//! - **identity** -- what it is: name, species, gender, diet,
//!   digestion period, park. Written only by `dino_added` events.
//! - **operational** -- its current situation: zone and last feeding.
//!   Written only by `dino_location_updated` / `dino_fed` events.
//!
//! The split is what makes out-of-order ingestion safe: a late-arriving
//! registration can never clobber a feeding the monitor already learned
//! about, and vice versa. Each group carries the event timestamp it was
//! last written at so replays resolve by last-writer-wins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::DietClass;
use crate::ids::MaintenanceRecordId;
use crate::zone::ZoneCode;

/// Canonical digestion period applied when a carnivore's identity has
/// never been received (the dinosaur is known only from operational
/// events). Twelve hours, matching the documented safety window.
pub const DEFAULT_DIGESTION_PERIOD_HOURS: i32 = 12;

/// The identity field group of a dinosaur, as carried by a fully
/// validated `dino_added` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DinosaurIdentity {
    /// Feed-assigned stable identifier. Immutable and unique.
    pub external_id: i64,
    /// Display name.
    pub name: String,
    /// Species label.
    pub species: String,
    /// Gender label.
    pub gender: String,
    /// Diet classification.
    pub diet: DietClass,
    /// Hours a feeding keeps this dinosaur docile. Always positive.
    pub digestion_period_hours: i32,
    /// Park this dinosaur belongs to.
    pub park_id: i32,
}

/// A dinosaur as stored: identity and operational groups, either of
/// which may still be unknown.
///
/// A dinosaur first seen through an operational event (feeding or
/// sighting before registration) exists as a *shell*: identity fields
/// are all `None` until its `dino_added` event arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dinosaur {
    /// Feed-assigned stable identifier. Immutable and unique.
    pub external_id: i64,
    /// Display name, unset on shell rows.
    pub name: Option<String>,
    /// Species label, unset on shell rows.
    pub species: Option<String>,
    /// Gender label, unset on shell rows.
    pub gender: Option<String>,
    /// Diet classification, unset on shell rows.
    pub diet: Option<DietClass>,
    /// Digestion period in hours, unset on shell rows.
    pub digestion_period_hours: Option<i32>,
    /// Park this dinosaur belongs to, unset on shell rows.
    pub park_id: Option<i32>,
    /// Zone of the most recent sighting. `None` means location unknown.
    pub current_zone: Option<ZoneCode>,
    /// Timestamp of the most recent feeding. `None` means never fed.
    pub last_fed_at: Option<DateTime<Utc>>,
    /// Event timestamp the identity group was last written at.
    pub identity_updated_at: Option<DateTime<Utc>>,
    /// Event timestamp the location was last written at.
    pub location_updated_at: Option<DateTime<Utc>>,
}

impl Dinosaur {
    /// Create a shell row: known only by external id, everything else
    /// unset.
    pub const fn shell(external_id: i64) -> Self {
        Self {
            external_id,
            name: None,
            species: None,
            gender: None,
            diet: None,
            digestion_period_hours: None,
            park_id: None,
            current_zone: None,
            last_fed_at: None,
            identity_updated_at: None,
            location_updated_at: None,
        }
    }

    /// Whether this dinosaur is a known carnivore.
    ///
    /// Shell rows (diet unknown) return `false` here; the safety rule
    /// only counts confirmed carnivores.
    pub fn is_carnivore(&self) -> bool {
        self.diet == Some(DietClass::Carnivore)
    }

    /// The digestion period to use for safety evaluation, falling back
    /// to [`DEFAULT_DIGESTION_PERIOD_HOURS`] when identity is unknown.
    pub fn digestion_period(&self) -> i32 {
        self.digestion_period_hours
            .unwrap_or(DEFAULT_DIGESTION_PERIOD_HOURS)
    }
}

/// One row of the append-only maintenance history for a zone.
///
/// Rows are keyed naturally by `(zone, performed_at)` so an at-least-once
/// feed can replay the same maintenance event without duplicating
/// history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    /// Row identifier.
    pub id: MaintenanceRecordId,
    /// The zone that was maintained.
    pub zone: ZoneCode,
    /// When the maintenance was performed (event-carried timestamp).
    pub performed_at: DateTime<Utc>,
    /// When this monitor recorded the event.
    pub recorded_at: DateTime<Utc>,
}
