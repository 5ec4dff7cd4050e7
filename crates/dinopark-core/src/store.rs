//! The entity-store interface the reconciliation engine writes into.
//!
//! The engine never implements merging as separate read-then-write
//! calls; every mutation on this interface is a single *conditional
//! upsert* the backing store applies atomically. That is what keeps
//! concurrent batch runs (a manual backfill overlapping a scheduled
//! poll) safe without any locking between them: each per-field-group
//! merge is idempotent and commutative, so interleavings converge.
//!
//! Two implementations exist: `PgStore` in `dinopark-db` (PostgreSQL
//! `INSERT .. ON CONFLICT`, the production backend) and [`MemoryStore`]
//! here (`RwLock`ed maps applying the same merge rules), which unit and
//! API tests run against.

use std::collections::BTreeMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use dinopark_types::{Dinosaur, DinosaurIdentity, MaintenanceRecord, MaintenanceRecordId, ZoneCode};

/// Errors surfaced by an entity store.
///
/// Store failures never crash the engine: the reconciler reports them
/// per event, and the safety evaluator resolves them to "unsafe".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or refused the operation.
    #[error("entity store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be interpreted (e.g. an off-grid zone
    /// code written by an older version).
    #[error("stored row is malformed: {0}")]
    MalformedRow(String),
}

/// Persistent state operations the engine needs from its store.
///
/// Mutations are *conditional upserts* keyed on natural identity (the
/// feed-assigned external id, or the zone code) -- never on surrogate
/// keys -- and scoped to one field group each. Implementations must
/// apply each call atomically.
///
/// Futures are declared `Send` so the engine can run on a
/// multi-threaded runtime.
pub trait EntityStore: Send + Sync {
    /// Write the identity field group of a dinosaur, creating the row if
    /// absent.
    ///
    /// The write only lands if `observed_at` is at least as new as the
    /// last identity write (last-writer-wins per field group). The
    /// operational fields (`current_zone`, `last_fed_at`) are never
    /// touched.
    fn upsert_identity(
        &self,
        identity: &DinosaurIdentity,
        observed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Write `current_zone`, creating a shell row if the dinosaur is
    /// unknown. Guarded by the location's last-writer-wins timestamp.
    fn upsert_location(
        &self,
        external_id: i64,
        zone: ZoneCode,
        observed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Write `last_fed_at`, creating a shell row if the dinosaur is
    /// unknown. The newest feeding always wins, so replays are no-ops.
    fn upsert_feeding(
        &self,
        external_id: i64,
        fed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Delete a dinosaur by external id. Returns whether a row existed;
    /// deleting an unknown id is a benign no-op, not an error.
    fn remove_dinosaur(
        &self,
        external_id: i64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Point query by external id.
    fn get_dinosaur(
        &self,
        external_id: i64,
    ) -> impl Future<Output = Result<Option<Dinosaur>, StoreError>> + Send;

    /// All dinosaurs, ordered by external id.
    fn list_dinosaurs(&self) -> impl Future<Output = Result<Vec<Dinosaur>, StoreError>> + Send;

    /// The confirmed carnivores currently located in a zone.
    ///
    /// This is the safety evaluator's live point query.
    fn carnivores_in_zone(
        &self,
        zone: ZoneCode,
    ) -> impl Future<Output = Result<Vec<Dinosaur>, StoreError>> + Send;

    /// Record a completed maintenance: append one history row (keyed by
    /// `(zone, performed_at)`, so replays do not duplicate) and advance
    /// the zone's latest-maintenance timestamp if this one is newer.
    fn record_maintenance(
        &self,
        zone: ZoneCode,
        performed_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// The latest maintenance timestamp for a zone, if any.
    fn last_maintenance(
        &self,
        zone: ZoneCode,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>, StoreError>> + Send;

    /// Latest maintenance timestamps for every zone that has one.
    ///
    /// Zones absent from the map have never been maintained.
    fn all_last_maintenance(
        &self,
    ) -> impl Future<Output = Result<BTreeMap<ZoneCode, DateTime<Utc>>, StoreError>> + Send;

    /// Maintenance history for a zone, newest first.
    fn maintenance_history(
        &self,
        zone: ZoneCode,
    ) -> impl Future<Output = Result<Vec<MaintenanceRecord>, StoreError>> + Send;

    /// Ensure a row exists for every grid zone. Idempotent; run at
    /// service startup.
    fn seed_zones(
        &self,
        codes: &[ZoneCode],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Mutable state behind the in-memory store's lock.
#[derive(Debug, Default)]
struct MemoryInner {
    /// Dinosaur rows keyed by external id.
    dinosaurs: BTreeMap<i64, Dinosaur>,
    /// Latest maintenance timestamp per seeded zone.
    zones: BTreeMap<ZoneCode, Option<DateTime<Utc>>>,
    /// Maintenance history keyed by the natural `(zone, performed_at)`.
    maintenance: BTreeMap<(ZoneCode, DateTime<Utc>), MaintenanceRecord>,
}

/// In-memory [`EntityStore`] applying the same merge rules as the
/// PostgreSQL backend.
///
/// Used by unit and API tests, and handy for local development without
/// a database. The `set_unavailable` switch simulates a store outage so
/// tests can exercise the fail-unsafe paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle simulated outage: while set, every operation fails with
    /// [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }

    /// Run `f` under the write lock, mapping poisoning and the outage
    /// switch to [`StoreError::Unavailable`].
    fn with_inner<T>(
        &self,
        f: impl FnOnce(&mut MemoryInner) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable(
                "simulated outage".to_owned(),
            ));
        }
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
        f(&mut inner)
    }
}

impl EntityStore for MemoryStore {
    async fn upsert_identity(
        &self,
        identity: &DinosaurIdentity,
        observed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.with_inner(|inner| {
            let row = inner
                .dinosaurs
                .entry(identity.external_id)
                .or_insert_with(|| Dinosaur::shell(identity.external_id));
            // Last-writer-wins on the identity group; an equal timestamp
            // re-applies the same event, which must stay a no-op in effect.
            let stale = row
                .identity_updated_at
                .is_some_and(|existing| existing > observed_at);
            if !stale {
                row.name = Some(identity.name.clone());
                row.species = Some(identity.species.clone());
                row.gender = Some(identity.gender.clone());
                row.diet = Some(identity.diet);
                row.digestion_period_hours = Some(identity.digestion_period_hours);
                row.park_id = Some(identity.park_id);
                row.identity_updated_at = Some(observed_at);
            }
            Ok(())
        })
    }

    async fn upsert_location(
        &self,
        external_id: i64,
        zone: ZoneCode,
        observed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.with_inner(|inner| {
            let row = inner
                .dinosaurs
                .entry(external_id)
                .or_insert_with(|| Dinosaur::shell(external_id));
            let stale = row
                .location_updated_at
                .is_some_and(|existing| existing > observed_at);
            if !stale {
                row.current_zone = Some(zone);
                row.location_updated_at = Some(observed_at);
            }
            Ok(())
        })
    }

    async fn upsert_feeding(
        &self,
        external_id: i64,
        fed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.with_inner(|inner| {
            let row = inner
                .dinosaurs
                .entry(external_id)
                .or_insert_with(|| Dinosaur::shell(external_id));
            // The newest feeding wins; the field is its own merge key.
            if row.last_fed_at.is_none_or(|existing| existing < fed_at) {
                row.last_fed_at = Some(fed_at);
            }
            Ok(())
        })
    }

    async fn remove_dinosaur(&self, external_id: i64) -> Result<bool, StoreError> {
        self.with_inner(|inner| Ok(inner.dinosaurs.remove(&external_id).is_some()))
    }

    async fn get_dinosaur(&self, external_id: i64) -> Result<Option<Dinosaur>, StoreError> {
        self.with_inner(|inner| Ok(inner.dinosaurs.get(&external_id).cloned()))
    }

    async fn list_dinosaurs(&self) -> Result<Vec<Dinosaur>, StoreError> {
        self.with_inner(|inner| Ok(inner.dinosaurs.values().cloned().collect()))
    }

    async fn carnivores_in_zone(&self, zone: ZoneCode) -> Result<Vec<Dinosaur>, StoreError> {
        self.with_inner(|inner| {
            Ok(inner
                .dinosaurs
                .values()
                .filter(|d| d.current_zone == Some(zone) && d.is_carnivore())
                .cloned()
                .collect())
        })
    }

    async fn record_maintenance(
        &self,
        zone: ZoneCode,
        performed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.with_inner(|inner| {
            inner
                .maintenance
                .entry((zone, performed_at))
                .or_insert_with(|| MaintenanceRecord {
                    id: MaintenanceRecordId::new(),
                    zone,
                    performed_at,
                    recorded_at: Utc::now(),
                });
            let latest = inner.zones.entry(zone).or_insert(None);
            if latest.is_none_or(|existing| existing < performed_at) {
                *latest = Some(performed_at);
            }
            Ok(())
        })
    }

    async fn last_maintenance(&self, zone: ZoneCode) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.with_inner(|inner| Ok(inner.zones.get(&zone).copied().flatten()))
    }

    async fn all_last_maintenance(
        &self,
    ) -> Result<BTreeMap<ZoneCode, DateTime<Utc>>, StoreError> {
        self.with_inner(|inner| {
            Ok(inner
                .zones
                .iter()
                .filter_map(|(zone, at)| at.map(|at| (*zone, at)))
                .collect())
        })
    }

    async fn maintenance_history(
        &self,
        zone: ZoneCode,
    ) -> Result<Vec<MaintenanceRecord>, StoreError> {
        self.with_inner(|inner| {
            let mut rows: Vec<MaintenanceRecord> = inner
                .maintenance
                .values()
                .filter(|r| r.zone == zone)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.performed_at.cmp(&a.performed_at));
            Ok(rows)
        })
    }

    async fn seed_zones(&self, codes: &[ZoneCode]) -> Result<(), StoreError> {
        self.with_inner(|inner| {
            for code in codes {
                inner.zones.entry(*code).or_insert(None);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    // Tests panic on failure -- that is the correct behavior in test code.
    #![allow(clippy::unwrap_used, clippy::panic)]

    use chrono::TimeZone;
    use dinopark_types::DietClass;

    use super::*;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).single().unwrap()
    }

    fn zone(code: &str) -> ZoneCode {
        code.parse().unwrap()
    }

    fn identity(external_id: i64) -> DinosaurIdentity {
        DinosaurIdentity {
            external_id,
            name: "Pounce".to_owned(),
            species: "Velociraptor".to_owned(),
            gender: "female".to_owned(),
            diet: DietClass::Carnivore,
            digestion_period_hours: 12,
            park_id: 1,
        }
    }

    #[tokio::test]
    async fn identity_upsert_never_touches_operational_fields() {
        let store = MemoryStore::new();
        store.upsert_location(7, zone("E10"), at(1)).await.unwrap();
        store.upsert_feeding(7, at(2)).await.unwrap();

        store.upsert_identity(&identity(7), at(3)).await.unwrap();

        let dino = store.get_dinosaur(7).await.unwrap().unwrap();
        assert_eq!(dino.name.as_deref(), Some("Pounce"));
        assert_eq!(dino.current_zone, Some(zone("E10")));
        assert_eq!(dino.last_fed_at, Some(at(2)));
    }

    #[tokio::test]
    async fn stale_identity_write_loses() {
        let store = MemoryStore::new();
        store.upsert_identity(&identity(7), at(5)).await.unwrap();

        let mut older = identity(7);
        older.name = "Old Name".to_owned();
        store.upsert_identity(&older, at(4)).await.unwrap();

        let dino = store.get_dinosaur(7).await.unwrap().unwrap();
        assert_eq!(dino.name.as_deref(), Some("Pounce"));
        assert_eq!(dino.identity_updated_at, Some(at(5)));
    }

    #[tokio::test]
    async fn newest_feeding_wins_regardless_of_arrival_order() {
        let store = MemoryStore::new();
        store.upsert_feeding(7, at(6)).await.unwrap();
        store.upsert_feeding(7, at(3)).await.unwrap();

        let dino = store.get_dinosaur(7).await.unwrap().unwrap();
        assert_eq!(dino.last_fed_at, Some(at(6)));
    }

    #[tokio::test]
    async fn maintenance_replay_appends_no_duplicate_history() {
        let store = MemoryStore::new();
        store.record_maintenance(zone("B2"), at(1)).await.unwrap();
        store.record_maintenance(zone("B2"), at(1)).await.unwrap();
        store.record_maintenance(zone("B2"), at(4)).await.unwrap();

        let history = store.maintenance_history(zone("B2")).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history.first().map(|r| r.performed_at), Some(at(4)));

        let latest = store.last_maintenance(zone("B2")).await.unwrap();
        assert_eq!(latest, Some(at(4)));
    }

    #[tokio::test]
    async fn carnivores_in_zone_excludes_herbivores_and_other_zones() {
        let store = MemoryStore::new();
        store.upsert_identity(&identity(1), at(0)).await.unwrap();
        store.upsert_location(1, zone("A0"), at(0)).await.unwrap();

        let mut herb = identity(2);
        herb.diet = DietClass::Herbivore;
        store.upsert_identity(&herb, at(0)).await.unwrap();
        store.upsert_location(2, zone("A0"), at(0)).await.unwrap();

        store.upsert_identity(&identity(3), at(0)).await.unwrap();
        store.upsert_location(3, zone("B0"), at(0)).await.unwrap();

        let carnivores = store.carnivores_in_zone(zone("A0")).await.unwrap();
        assert_eq!(carnivores.len(), 1);
        assert_eq!(carnivores.first().map(|d| d.external_id), Some(1));
    }

    #[tokio::test]
    async fn outage_switch_fails_every_operation() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let result = store.get_dinosaur(1).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }
}
