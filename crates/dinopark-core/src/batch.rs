//! Drives a batch of feed events through the reconciler.
//!
//! The batch is ordered-but-not-trusted: one bad event must never abort
//! the rest. The coordinator applies every event, tallies successes and
//! failures, and collects the failure causes for the caller. Every
//! event is logged with its kind and originating park before dispatch
//! so a failed batch can be replayed and diagnosed from the log alone.

use std::sync::Arc;

use dinopark_types::FeedEvent;
use serde::{Deserialize, Serialize};

use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::store::EntityStore;

/// Summary of one processed batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Events applied, skipped as tolerated-malformed, or no-oped.
    pub processed: u32,
    /// Events rejected by validation or failed by the store.
    pub failed: u32,
    /// One cause per failed event, in batch order.
    pub errors: Vec<String>,
}

impl BatchOutcome {
    /// Total number of events the batch contained.
    pub const fn total(&self) -> u32 {
        self.processed.saturating_add(self.failed)
    }
}

/// Applies event batches via a [`Reconciler`], never aborting on a
/// single failure.
#[derive(Debug)]
pub struct BatchCoordinator<S> {
    reconciler: Reconciler<S>,
}

impl<S> Clone for BatchCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            reconciler: self.reconciler.clone(),
        }
    }
}

impl<S: EntityStore> BatchCoordinator<S> {
    /// Create a coordinator writing into the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            reconciler: Reconciler::new(store),
        }
    }

    /// Apply every event in the batch and summarize the result.
    ///
    /// Failures are counted and recorded, never propagated: the
    /// remaining events always run.
    pub async fn process(&self, events: &[FeedEvent]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for event in events {
            tracing::info!(
                kind = %event.kind(),
                park_id = ?event.park_id(),
                "applying feed event"
            );

            match self.reconciler.apply(event).await {
                Ok(ReconcileOutcome::Skipped { reason }) => {
                    tracing::warn!(
                        kind = %event.kind(),
                        park_id = ?event.park_id(),
                        reason,
                        "skipped malformed feed event"
                    );
                    outcome.processed = outcome.processed.saturating_add(1);
                }
                Ok(_) => {
                    outcome.processed = outcome.processed.saturating_add(1);
                }
                Err(error) => {
                    tracing::warn!(
                        kind = %event.kind(),
                        park_id = ?event.park_id(),
                        %error,
                        "feed event failed"
                    );
                    outcome.failed = outcome.failed.saturating_add(1);
                    outcome.errors.push(error.to_string());
                }
            }
        }

        tracing::info!(
            processed = outcome.processed,
            failed = outcome.failed,
            "batch complete"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    // Tests panic on failure -- that is the correct behavior in test code.
    #![allow(clippy::unwrap_used, clippy::panic)]

    use chrono::{DateTime, TimeZone, Utc};
    use dinopark_types::{
        DietClass, DinoAdded, DinoFed, DinoRemoved, MaintenancePerformed, ZoneCode,
    };

    use super::*;
    use crate::store::MemoryStore;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).single().unwrap()
    }

    fn coordinator() -> (BatchCoordinator<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (BatchCoordinator::new(Arc::clone(&store)), store)
    }

    #[tokio::test]
    async fn one_failure_does_not_abort_the_batch() {
        let (coordinator, store) = coordinator();
        let zone: ZoneCode = "D4".parse().unwrap();

        let events = vec![
            // Hard failure: maintenance without a zone.
            FeedEvent::MaintenancePerformed(MaintenancePerformed {
                zone: None,
                park_id: Some(1),
                time: Some(at(1)),
            }),
            // Valid maintenance, must still run.
            FeedEvent::MaintenancePerformed(MaintenancePerformed {
                zone: Some(zone),
                park_id: Some(1),
                time: Some(at(2)),
            }),
            // Valid feeding, must still run.
            FeedEvent::DinoFed(DinoFed {
                dinosaur_id: Some(7),
                park_id: Some(1),
                time: Some(at(3)),
            }),
        ];

        let outcome = coordinator.process(&events).await;
        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.total(), 3);

        assert_eq!(store.last_maintenance(zone).await.unwrap(), Some(at(2)));
        assert!(store.get_dinosaur(7).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn removal_of_unknown_id_counts_as_processed() {
        let (coordinator, _store) = coordinator();
        let events = vec![FeedEvent::DinoRemoved(DinoRemoved {
            dinosaur_id: Some(404),
            park_id: Some(1),
            time: Some(at(1)),
        })];

        let outcome = coordinator.process(&events).await;
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.failed, 0);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn tolerated_skips_count_as_processed() {
        let (coordinator, _store) = coordinator();
        let events = vec![FeedEvent::DinoFed(DinoFed {
            dinosaur_id: None,
            park_id: Some(1),
            time: Some(at(1)),
        })];

        let outcome = coordinator.process(&events).await;
        assert_eq!(outcome.processed, 1);
        assert_eq!(outcome.failed, 0);
    }

    #[tokio::test]
    async fn unordered_batch_converges_to_consistent_state() {
        // The feeding is delivered ahead of the chronologically older
        // registration.
        let (coordinator, store) = coordinator();
        let events = vec![
            FeedEvent::DinoFed(DinoFed {
                dinosaur_id: Some(7),
                park_id: Some(1),
                time: Some(at(10)),
            }),
            FeedEvent::DinoAdded(DinoAdded {
                dinosaur_id: Some(7),
                name: Some("Pounce".to_owned()),
                species: Some("Velociraptor".to_owned()),
                gender: Some("female".to_owned()),
                diet: Some(DietClass::Carnivore),
                digestion_period_hours: Some(12),
                park_id: Some(1),
                time: Some(at(1)),
            }),
        ];

        let outcome = coordinator.process(&events).await;
        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.failed, 0);

        let dino = store.get_dinosaur(7).await.unwrap().unwrap();
        assert_eq!(dino.diet, Some(DietClass::Carnivore));
        assert_eq!(dino.last_fed_at, Some(at(10)));
        assert_eq!(dino.current_zone, None);
    }
}
