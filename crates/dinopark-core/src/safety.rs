//! Zone safety and maintenance-due derivation.
//!
//! Safety is derived live from current store state on every request --
//! never cached -- because the answer gates whether park staff enter a
//! zone. The rules:
//!
//! - A zone is safe iff every confirmed carnivore currently in it is
//!   still digesting its last feeding. A carnivore with no recorded
//!   feeding counts as hungry. A zone with no carnivores is safe.
//! - A store failure during evaluation reports **unsafe**. The system
//!   prefers wrongly keeping staff out of a safe zone over wrongly
//!   sending them into an unsafe one.
//!
//! Maintenance is due when a zone has never been maintained or the last
//! maintenance is 30 or more days old (inclusive at exactly 30 days).

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dinopark_types::{Dinosaur, ZoneCode};

use crate::store::EntityStore;

/// Days after which a zone needs maintenance again.
const MAINTENANCE_INTERVAL_DAYS: i64 = 30;

/// Whether a dinosaur is still digesting its last feeding at `now`.
///
/// True iff it has been fed and strictly less than its digestion period
/// has elapsed since: a carnivore fed at `T` with a 12-hour period is
/// docile through `T+11h59m` and hungry again at exactly `T+12h`.
/// Never-fed dinosaurs are hungry -- the fail-safe default.
pub fn is_digesting(dinosaur: &Dinosaur, now: DateTime<Utc>) -> bool {
    dinosaur.last_fed_at.is_some_and(|fed_at| {
        let window = Duration::hours(i64::from(dinosaur.digestion_period()));
        now.signed_duration_since(fed_at) < window
    })
}

/// Whether a zone is safe to enter given its residents.
///
/// Pure over a resident list so the grid endpoint can evaluate all 416
/// zones from one store read. Only confirmed carnivores are considered;
/// herbivores and diet-unknown shells never make a zone unsafe.
pub fn zone_is_safe<'a, I>(residents: I, now: DateTime<Utc>) -> bool
where
    I: IntoIterator<Item = &'a Dinosaur>,
{
    residents
        .into_iter()
        .filter(|d| d.is_carnivore())
        .all(|d| is_digesting(d, now))
}

/// Whether a zone's maintenance is due.
///
/// Due when it has never been maintained, or when the last maintenance
/// is [`MAINTENANCE_INTERVAL_DAYS`] or more days old. The boundary is
/// inclusive: at exactly 30 days, maintenance is needed.
pub fn maintenance_due(last_maintenance_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    last_maintenance_at.is_none_or(|at| {
        now.signed_duration_since(at) >= Duration::days(MAINTENANCE_INTERVAL_DAYS)
    })
}

/// Evaluates zone safety against the live entity store.
#[derive(Debug)]
pub struct SafetyEvaluator<S> {
    store: Arc<S>,
}

impl<S> Clone for SafetyEvaluator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: EntityStore> SafetyEvaluator<S> {
    /// Create an evaluator reading from the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Is the zone safe to enter right now?
    ///
    /// Infallible on purpose: a store failure is logged and reported as
    /// unsafe rather than propagated, so callers can never mistake an
    /// outage for an all-clear.
    pub async fn evaluate_zone(&self, zone: ZoneCode) -> bool {
        self.evaluate_zone_at(zone, Utc::now()).await
    }

    /// [`Self::evaluate_zone`] at an explicit instant, for testability.
    pub async fn evaluate_zone_at(&self, zone: ZoneCode, now: DateTime<Utc>) -> bool {
        match self.store.carnivores_in_zone(zone).await {
            Ok(carnivores) => carnivores.iter().all(|d| is_digesting(d, now)),
            Err(error) => {
                tracing::warn!(
                    %zone,
                    %error,
                    "store failure during safety evaluation; reporting unsafe"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // Tests panic on failure -- that is the correct behavior in test code.
    #![allow(clippy::unwrap_used, clippy::panic)]

    use chrono::TimeZone;
    use dinopark_types::{DietClass, DinosaurIdentity};

    use super::*;
    use crate::store::MemoryStore;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap()
    }

    fn carnivore(id: i64, fed_at: Option<DateTime<Utc>>) -> Dinosaur {
        let mut dino = Dinosaur::shell(id);
        dino.diet = Some(DietClass::Carnivore);
        dino.digestion_period_hours = Some(12);
        dino.last_fed_at = fed_at;
        dino
    }

    fn herbivore(id: i64) -> Dinosaur {
        let mut dino = Dinosaur::shell(id);
        dino.diet = Some(DietClass::Herbivore);
        dino
    }

    #[test]
    fn digestion_window_boundary_is_strict() {
        let fed = t0();
        let dino = carnivore(1, Some(fed));

        let just_inside = fed + Duration::hours(11) + Duration::minutes(59);
        assert!(is_digesting(&dino, just_inside));

        let at_boundary = fed + Duration::hours(12);
        assert!(!is_digesting(&dino, at_boundary));
    }

    #[test]
    fn unfed_carnivore_is_hungry() {
        let dino = carnivore(1, None);
        assert!(!is_digesting(&dino, t0()));
    }

    #[test]
    fn zone_with_only_herbivores_is_safe() {
        let residents = vec![herbivore(1), herbivore(2), herbivore(3)];
        assert!(zone_is_safe(&residents, t0()));
    }

    #[test]
    fn empty_zone_is_safe() {
        let nobody: Vec<Dinosaur> = Vec::new();
        assert!(zone_is_safe(&nobody, t0()));
    }

    #[test]
    fn one_hungry_carnivore_makes_zone_unsafe() {
        let residents = vec![
            herbivore(1),
            carnivore(2, Some(t0() - Duration::hours(1))),
            carnivore(3, None),
        ];
        assert!(!zone_is_safe(&residents, t0()));
    }

    #[test]
    fn maintenance_due_boundaries() {
        let now = t0();
        assert!(maintenance_due(None, now));
        assert!(!maintenance_due(Some(now - Duration::days(29)), now));
        assert!(maintenance_due(Some(now - Duration::days(30)), now));
        assert!(maintenance_due(Some(now - Duration::days(31)), now));
    }

    #[tokio::test]
    async fn evaluator_reads_live_store_state() {
        let store = Arc::new(MemoryStore::new());
        let zone: ZoneCode = "E10".parse().unwrap();
        let identity = DinosaurIdentity {
            external_id: 7,
            name: "Pounce".to_owned(),
            species: "Velociraptor".to_owned(),
            gender: "female".to_owned(),
            diet: DietClass::Carnivore,
            digestion_period_hours: 12,
            park_id: 1,
        };
        store.upsert_identity(&identity, t0()).await.unwrap();
        store.upsert_location(7, zone, t0()).await.unwrap();

        let evaluator = SafetyEvaluator::new(Arc::clone(&store));

        // Not yet fed: unsafe.
        assert!(!evaluator.evaluate_zone_at(zone, t0()).await);

        // Fed now: safe until the digestion window closes.
        store.upsert_feeding(7, t0()).await.unwrap();
        assert!(evaluator.evaluate_zone_at(zone, t0() + Duration::hours(11)).await);
        assert!(!evaluator.evaluate_zone_at(zone, t0() + Duration::hours(12)).await);
    }

    #[tokio::test]
    async fn store_failure_reports_unsafe() {
        let store = Arc::new(MemoryStore::new());
        let zone: ZoneCode = "A0".parse().unwrap();
        let evaluator = SafetyEvaluator::new(Arc::clone(&store));

        // An empty, reachable store says safe...
        assert!(evaluator.evaluate_zone_at(zone, t0()).await);

        // ...but an unreachable one must never say safe.
        store.set_unavailable(true);
        assert!(!evaluator.evaluate_zone_at(zone, t0()).await);
    }
}
