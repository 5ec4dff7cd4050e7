//! Applies one inbound feed event to the entity store.
//!
//! The feed is at-least-once and unordered: the same event arrives
//! multiple times, and events for one dinosaur arrive in any relative
//! order (a feeding before the registration, a removal before a
//! sighting). Processing that assumes create-before-update is unsafe
//! here. Instead every event is an idempotent partial merge keyed on
//! natural identity (external id or zone code), scoped to exactly one
//! field group, and guarded by the event-carried timestamp -- so
//! applying an event N times, in any position, converges to the same
//! state as applying it once.
//!
//! Validation is per kind and deliberately asymmetric:
//!
//! - `dino_added` and `maintenance_performed` carry safety-relevant
//!   state; a malformed one is rejected loudly (a batch failure).
//! - `dino_removed` / `dino_location_updated` / `dino_fed` routinely
//!   arrive with partial data and are skipped with a warning -- they
//!   must not abort otherwise-healthy batches. A removal for an unknown
//!   id is a benign race, not a defect.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dinopark_types::{
    DinoAdded, DinoFed, DinoLocationUpdated, DinoRemoved, DinosaurIdentity, EventKind, FeedEvent,
    MaintenancePerformed, ZoneCode,
};

use crate::error::ReconcileError;
use crate::store::EntityStore;

/// What applying one event did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The event's field group was merged into the store.
    Applied,
    /// A dinosaur row was deleted.
    Removed,
    /// The event targeted a row that does not exist and required no
    /// change (e.g. removal of a never-seen dinosaur).
    NoOp,
    /// The event was malformed but of a tolerated kind; nothing was
    /// written. Carries the diagnostic for the log.
    Skipped {
        /// Why the event could not be applied.
        reason: String,
    },
}

/// Applies feed events to an [`EntityStore`] as field-scoped merges.
#[derive(Debug)]
pub struct Reconciler<S> {
    store: Arc<S>,
}

impl<S> Clone for Reconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: EntityStore> Reconciler<S> {
    /// Create a reconciler writing into the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Validation`] for malformed `dino_added`
    /// or `maintenance_performed` events, and [`ReconcileError::Store`]
    /// when the store fails. Malformed events of the tolerated kinds
    /// come back as [`ReconcileOutcome::Skipped`], not as errors.
    pub async fn apply(&self, event: &FeedEvent) -> Result<ReconcileOutcome, ReconcileError> {
        match event {
            FeedEvent::DinoAdded(e) => self.apply_added(e).await,
            FeedEvent::DinoRemoved(e) => self.apply_removed(e).await,
            FeedEvent::DinoLocationUpdated(e) => self.apply_location(e).await,
            FeedEvent::DinoFed(e) => self.apply_fed(e).await,
            FeedEvent::MaintenancePerformed(e) => self.apply_maintenance(e).await,
        }
    }

    /// Merge the identity field group. Never touches `current_zone` or
    /// `last_fed_at`, so a late registration cannot erase operational
    /// state learned from earlier-processed events.
    async fn apply_added(&self, event: &DinoAdded) -> Result<ReconcileOutcome, ReconcileError> {
        let (identity, observed_at) = validate_added(event)?;
        self.store.upsert_identity(&identity, observed_at).await?;
        Ok(ReconcileOutcome::Applied)
    }

    async fn apply_removed(&self, event: &DinoRemoved) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(external_id) = event.dinosaur_id else {
            return Ok(ReconcileOutcome::Skipped {
                reason: "dino_removed event missing dinosaur_id".to_owned(),
            });
        };
        let existed = self.store.remove_dinosaur(external_id).await?;
        Ok(if existed {
            ReconcileOutcome::Removed
        } else {
            // Double-removal or removal ahead of any other sighting:
            // a benign race on an at-least-once feed.
            ReconcileOutcome::NoOp
        })
    }

    async fn apply_location(
        &self,
        event: &DinoLocationUpdated,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let (external_id, zone, observed_at) = match validate_location(event) {
            Ok(parts) => parts,
            Err(reason) => return Ok(ReconcileOutcome::Skipped { reason }),
        };
        self.store
            .upsert_location(external_id, zone, observed_at)
            .await?;
        Ok(ReconcileOutcome::Applied)
    }

    async fn apply_fed(&self, event: &DinoFed) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(external_id) = event.dinosaur_id else {
            return Ok(ReconcileOutcome::Skipped {
                reason: "dino_fed event missing dinosaur_id".to_owned(),
            });
        };
        let Some(fed_at) = event.time else {
            return Ok(ReconcileOutcome::Skipped {
                reason: "dino_fed event missing feeding timestamp".to_owned(),
            });
        };
        self.store.upsert_feeding(external_id, fed_at).await?;
        Ok(ReconcileOutcome::Applied)
    }

    /// Maintenance drives the 30-day safety cycle, so a malformed event
    /// here must surface as a failure rather than vanish.
    async fn apply_maintenance(
        &self,
        event: &MaintenancePerformed,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let zone = event.zone.ok_or_else(|| {
            ReconcileError::validation(
                EventKind::MaintenancePerformed,
                "missing or invalid zone code",
            )
        })?;
        let performed_at = event.time.ok_or_else(|| {
            ReconcileError::validation(
                EventKind::MaintenancePerformed,
                "missing or invalid performed timestamp",
            )
        })?;
        self.store.record_maintenance(zone, performed_at).await?;
        Ok(ReconcileOutcome::Applied)
    }
}

/// Validate a `dino_added` payload into a full identity plus the
/// event timestamp that keys the identity merge.
fn validate_added(
    event: &DinoAdded,
) -> Result<(DinosaurIdentity, DateTime<Utc>), ReconcileError> {
    let kind = EventKind::DinoAdded;
    let missing = |field: &str| ReconcileError::validation(kind, format!("missing {field}"));

    let external_id = event.dinosaur_id.ok_or_else(|| missing("dinosaur_id"))?;
    let name = event.name.clone().ok_or_else(|| missing("name"))?;
    let species = event.species.clone().ok_or_else(|| missing("species"))?;
    let gender = event.gender.clone().ok_or_else(|| missing("gender"))?;
    let diet = event.diet.ok_or_else(|| missing("diet"))?;
    let digestion_period_hours = event
        .digestion_period_hours
        .ok_or_else(|| missing("digestion_period_hours"))?;
    let park_id = event.park_id.ok_or_else(|| missing("park_id"))?;
    let observed_at = event.time.ok_or_else(|| missing("time"))?;

    if digestion_period_hours <= 0 {
        return Err(ReconcileError::validation(
            kind,
            format!("digestion_period_hours must be positive, got {digestion_period_hours}"),
        ));
    }

    Ok((
        DinosaurIdentity {
            external_id,
            name,
            species,
            gender,
            diet,
            digestion_period_hours,
            park_id,
        },
        observed_at,
    ))
}

/// Validate a `dino_location_updated` payload. Failures are reasons to
/// skip, never hard errors.
fn validate_location(
    event: &DinoLocationUpdated,
) -> Result<(i64, ZoneCode, DateTime<Utc>), String> {
    let external_id = event
        .dinosaur_id
        .ok_or("dino_location_updated event missing dinosaur_id")?;
    let zone = event
        .zone
        .ok_or("dino_location_updated event missing or off-grid zone code")?;
    // Without the event timestamp the merge cannot be ordered against
    // other sightings, so the event is unusable.
    let observed_at = event
        .time
        .ok_or("dino_location_updated event missing sighting timestamp")?;
    Ok((external_id, zone, observed_at))
}
