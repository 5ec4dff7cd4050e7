//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds a handle to the entity store plus the engine
//! components the handlers dispatch into. It is generic over the store
//! so production wires in the `PostgreSQL` backend while API tests use
//! the in-memory one.

use std::sync::Arc;

use dinopark_core::batch::BatchCoordinator;
use dinopark_core::poller::PollerState;
use dinopark_core::safety::SafetyEvaluator;
use dinopark_core::store::EntityStore;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. The
/// poller handle is optional: a process running ingest-free (e.g. a
/// read-only replica of the API) simply has no ingestion status to
/// report.
pub struct AppState<S> {
    /// The entity store all reads and manual ingests go through.
    pub store: Arc<S>,
    /// Live zone-safety evaluation.
    pub evaluator: SafetyEvaluator<S>,
    /// Batch application for the manual ingest endpoint.
    pub coordinator: BatchCoordinator<S>,
    /// Status handle of the scheduled poller, when one is running.
    pub poller: Option<Arc<PollerState>>,
}

impl<S: EntityStore> AppState<S> {
    /// Create application state without a poller attached.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            evaluator: SafetyEvaluator::new(Arc::clone(&store)),
            coordinator: BatchCoordinator::new(Arc::clone(&store)),
            poller: None,
            store,
        }
    }

    /// Create application state with a poller status handle attached.
    pub fn with_poller(store: Arc<S>, poller: Arc<PollerState>) -> Self {
        let mut state = Self::new(store);
        state.poller = Some(poller);
        state
    }
}
