//! The closed set of feed events delivered by the upstream park feed.
//!
//! The feed is at-least-once and unordered: events arrive duplicated, out
//! of order, and sometimes with fields missing or mangled. The types here
//! are therefore deliberately lenient at the wire boundary -- every
//! payload field is an `Option`, and a field that fails to decode (wrong
//! type, malformed timestamp, off-grid zone code) collapses to `None`
//! instead of poisoning the whole item. Deciding whether a missing field
//! is a validation failure or a tolerated skip is the reconciler's job,
//! because the answer differs per kind.
//!
//! The enum is closed over exactly the five known kinds. Items with an
//! unknown `kind` tag fail to decode as a [`FeedEvent`]; the feed client
//! logs and drops them so future feed evolution never breaks ingestion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::enums::{DietClass, EventKind};
use crate::zone::ZoneCode;

/// Decode a field leniently: a value that fails to parse becomes `None`.
///
/// The feed has been observed delivering numbers as strings, unparseable
/// timestamps, and zone codes off the grid. Those must not make the
/// whole event undecodable -- per-kind validation downstream decides
/// what a missing value means.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Payload of a `dino_added` event: a dinosaur registered with the park.
///
/// Carries the full identity set. All fields are required for the event
/// to be valid; the reconciler rejects the event otherwise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DinoAdded {
    /// Feed-assigned stable identifier.
    #[serde(default, deserialize_with = "lenient")]
    pub dinosaur_id: Option<i64>,
    /// Display name.
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    /// Species label (free text from the feed).
    #[serde(default, deserialize_with = "lenient")]
    pub species: Option<String>,
    /// Gender label (free text from the feed).
    #[serde(default, deserialize_with = "lenient")]
    pub gender: Option<String>,
    /// Diet classification.
    #[serde(default, deserialize_with = "lenient")]
    pub diet: Option<DietClass>,
    /// Hours a feeding keeps this dinosaur docile. Must be positive.
    #[serde(default, deserialize_with = "lenient")]
    pub digestion_period_hours: Option<i32>,
    /// Park the event originates from.
    #[serde(default, deserialize_with = "lenient")]
    pub park_id: Option<i32>,
    /// When the registration happened (event-carried timestamp).
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<DateTime<Utc>>,
}

/// Payload of a `dino_removed` event: a dinosaur left the park.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DinoRemoved {
    /// Feed-assigned stable identifier.
    #[serde(default, deserialize_with = "lenient")]
    pub dinosaur_id: Option<i64>,
    /// Park the event originates from.
    #[serde(default, deserialize_with = "lenient")]
    pub park_id: Option<i32>,
    /// When the removal happened.
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<DateTime<Utc>>,
}

/// Payload of a `dino_location_updated` event: a zone sighting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DinoLocationUpdated {
    /// Feed-assigned stable identifier.
    #[serde(default, deserialize_with = "lenient")]
    pub dinosaur_id: Option<i64>,
    /// The zone the dinosaur was sighted in.
    #[serde(default, deserialize_with = "lenient")]
    pub zone: Option<ZoneCode>,
    /// Park the event originates from.
    #[serde(default, deserialize_with = "lenient")]
    pub park_id: Option<i32>,
    /// When the sighting happened (event-carried timestamp).
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<DateTime<Utc>>,
}

/// Payload of a `dino_fed` event: a feeding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DinoFed {
    /// Feed-assigned stable identifier.
    #[serde(default, deserialize_with = "lenient")]
    pub dinosaur_id: Option<i64>,
    /// Park the event originates from.
    #[serde(default, deserialize_with = "lenient")]
    pub park_id: Option<i32>,
    /// When the feeding happened. Doubles as the new `last_fed_at`.
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<DateTime<Utc>>,
}

/// Payload of a `maintenance_performed` event: zone upkeep completed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaintenancePerformed {
    /// The zone that was maintained.
    #[serde(default, deserialize_with = "lenient")]
    pub zone: Option<ZoneCode>,
    /// Park the event originates from.
    #[serde(default, deserialize_with = "lenient")]
    pub park_id: Option<i32>,
    /// When the maintenance was performed.
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<DateTime<Utc>>,
}

/// One event from the park feed, discriminated by the `kind` wire tag.
///
/// Exactly five kinds exist. The enum is matched exhaustively everywhere;
/// unknown kinds never reach it (they are dropped at decode).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEvent {
    /// A dinosaur was registered with the park.
    DinoAdded(DinoAdded),
    /// A dinosaur left the park.
    DinoRemoved(DinoRemoved),
    /// A dinosaur was sighted in a zone.
    DinoLocationUpdated(DinoLocationUpdated),
    /// A dinosaur was fed.
    DinoFed(DinoFed),
    /// A zone received maintenance.
    MaintenancePerformed(MaintenancePerformed),
}

/// Result of decoding a raw JSON batch into typed events.
///
/// Items that are not one of the five known kinds (or are not objects
/// at all) land in `skipped` with a human-readable reason, so callers
/// can log them and move on -- feed evolution must never break
/// ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedBatch {
    /// The events that decoded to a known kind.
    pub events: Vec<FeedEvent>,
    /// One reason per undecodable item, in batch order.
    pub skipped: Vec<String>,
}

impl FeedEvent {
    /// Decode a raw JSON array item-by-item, tolerating unknown kinds.
    ///
    /// A malformed *field* inside a known kind still decodes (to
    /// `None`, see [`lenient`]); only an unknown or missing `kind` tag
    /// makes an item undecodable.
    pub fn decode_batch(values: Vec<serde_json::Value>) -> DecodedBatch {
        let mut batch = DecodedBatch::default();
        for value in values {
            let kind = value
                .get("kind")
                .and_then(serde_json::Value::as_str)
                .map(ToOwned::to_owned);
            match serde_json::from_value::<Self>(value) {
                Ok(event) => batch.events.push(event),
                Err(error) => batch.skipped.push(match kind {
                    Some(kind) => format!("unknown event kind {kind:?}: {error}"),
                    None => format!("event without a kind tag: {error}"),
                }),
            }
        }
        batch
    }

    /// The kind discriminant, for logging and error messages.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::DinoAdded(_) => EventKind::DinoAdded,
            Self::DinoRemoved(_) => EventKind::DinoRemoved,
            Self::DinoLocationUpdated(_) => EventKind::DinoLocationUpdated,
            Self::DinoFed(_) => EventKind::DinoFed,
            Self::MaintenancePerformed(_) => EventKind::MaintenancePerformed,
        }
    }

    /// The originating park identifier, when the event carried one.
    pub const fn park_id(&self) -> Option<i32> {
        match self {
            Self::DinoAdded(e) => e.park_id,
            Self::DinoRemoved(e) => e.park_id,
            Self::DinoLocationUpdated(e) => e.park_id,
            Self::DinoFed(e) => e.park_id,
            Self::MaintenancePerformed(e) => e.park_id,
        }
    }

    /// The event-carried timestamp, when the event carried one.
    pub const fn time(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::DinoAdded(e) => e.time,
            Self::DinoRemoved(e) => e.time,
            Self::DinoLocationUpdated(e) => e.time,
            Self::DinoFed(e) => e.time,
            Self::MaintenancePerformed(e) => e.time,
        }
    }
}

#[cfg(test)]
mod tests {
    // Tests panic on failure -- that is the correct behavior in test code.
    #![allow(clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn decodes_dino_added() {
        let raw = serde_json::json!({
            "kind": "dino_added",
            "dinosaur_id": 42,
            "name": "Pounce",
            "species": "Velociraptor",
            "gender": "female",
            "diet": "carnivore",
            "digestion_period_hours": 12,
            "park_id": 1,
            "time": "2026-03-01T08:30:00Z",
        });
        match serde_json::from_value::<FeedEvent>(raw) {
            Ok(FeedEvent::DinoAdded(added)) => {
                assert_eq!(added.dinosaur_id, Some(42));
                assert_eq!(added.diet, Some(DietClass::Carnivore));
                assert_eq!(added.digestion_period_hours, Some(12));
            }
            other => panic!("expected dino_added, got {other:?}"),
        }
    }

    #[test]
    fn missing_fields_decode_to_none() {
        let raw = serde_json::json!({
            "kind": "dino_location_updated",
            "dinosaur_id": 7,
        });
        match serde_json::from_value::<FeedEvent>(raw) {
            Ok(FeedEvent::DinoLocationUpdated(moved)) => {
                assert_eq!(moved.dinosaur_id, Some(7));
                assert_eq!(moved.zone, None);
                assert_eq!(moved.time, None);
            }
            other => panic!("expected dino_location_updated, got {other:?}"),
        }
    }

    #[test]
    fn mangled_fields_decode_to_none() {
        // Off-grid zone, unparseable timestamp, string id: each collapses
        // to None rather than failing the item.
        let raw = serde_json::json!({
            "kind": "dino_location_updated",
            "dinosaur_id": "seven",
            "zone": "Z16",
            "time": "not-a-timestamp",
        });
        match serde_json::from_value::<FeedEvent>(raw) {
            Ok(FeedEvent::DinoLocationUpdated(moved)) => {
                assert_eq!(moved.dinosaur_id, None);
                assert_eq!(moved.zone, None);
                assert_eq!(moved.time, None);
            }
            other => panic!("expected dino_location_updated, got {other:?}"),
        }
    }

    #[test]
    fn unknown_kind_fails_to_decode() {
        let raw = serde_json::json!({
            "kind": "dino_cloned",
            "dinosaur_id": 9,
        });
        let event: Result<FeedEvent, serde_json::Error> = serde_json::from_value(raw);
        assert!(event.is_err());
    }

    #[test]
    fn decode_batch_drops_unknown_kinds_only() {
        let values = vec![
            serde_json::json!({"kind": "dino_fed", "dinosaur_id": 1, "time": "2026-03-01T08:00:00Z"}),
            serde_json::json!({"kind": "dino_cloned", "dinosaur_id": 2}),
            serde_json::json!({"no_kind_here": true}),
            serde_json::json!({"kind": "maintenance_performed", "zone": "B2", "time": "2026-03-01T09:00:00Z"}),
        ];
        let batch = FeedEvent::decode_batch(values);
        assert_eq!(batch.events.len(), 2);
        assert_eq!(batch.skipped.len(), 2);
        assert!(
            batch
                .skipped
                .first()
                .is_some_and(|r| r.contains("dino_cloned"))
        );
    }

    #[test]
    fn kind_accessor_matches_wire_tag() {
        let event = FeedEvent::DinoFed(DinoFed {
            dinosaur_id: Some(3),
            park_id: Some(1),
            time: None,
        });
        assert_eq!(event.kind(), EventKind::DinoFed);
        assert_eq!(event.park_id(), Some(1));
    }
}
