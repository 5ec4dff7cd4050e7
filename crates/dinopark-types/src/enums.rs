//! Enumeration types shared across the monitor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Diet classification of a dinosaur.
///
/// The zone safety rule only cares about carnivores: a zone with no
/// carnivores in it is safe no matter how many herbivores graze there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DietClass {
    /// Meat-eater; dangerous to park staff unless recently fed.
    Carnivore,
    /// Plant-eater; never makes a zone unsafe.
    Herbivore,
}

impl fmt::Display for DietClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Carnivore => write!(f, "carnivore"),
            Self::Herbivore => write!(f, "herbivore"),
        }
    }
}

/// The kind of a feed event, used for logging and error reporting.
///
/// This mirrors the variants of [`FeedEvent`](crate::events::FeedEvent)
/// without carrying the payload, so batch logs and error messages can
/// name the kind cheaply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A dinosaur was registered with the park.
    DinoAdded,
    /// A dinosaur left the park (transfer, death, escape cleanup).
    DinoRemoved,
    /// A dinosaur was sighted in a zone.
    DinoLocationUpdated,
    /// A dinosaur was fed.
    DinoFed,
    /// A zone received maintenance.
    MaintenancePerformed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DinoAdded => "dino_added",
            Self::DinoRemoved => "dino_removed",
            Self::DinoLocationUpdated => "dino_location_updated",
            Self::DinoFed => "dino_fed",
            Self::MaintenancePerformed => "maintenance_performed",
        };
        write!(f, "{name}")
    }
}
