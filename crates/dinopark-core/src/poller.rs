//! The feed polling component.
//!
//! A [`Poller`] periodically pulls a batch of events from an
//! [`EventSource`] and submits it to the [`BatchCoordinator`]. It is an
//! explicit, injectable component: it owns an [`Arc<PollerState>`]
//! (status plus counters) that callers hold a handle to, rather than
//! any process-wide singleton. Several pollers, or a poller plus a
//! manual backfill, can run against the same store concurrently -- the
//! merge rules, not mutual exclusion, are what keeps that safe.
//!
//! Counters use atomics so the status endpoint reads them without
//! touching the poll loop; the few compound fields sit behind a
//! [`tokio::sync::RwLock`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dinopark_types::FeedEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::batch::{BatchCoordinator, BatchOutcome};
use crate::store::EntityStore;

/// A fetch from the upstream feed failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("feed source error: {0}")]
pub struct SourceError(pub String);

/// Something that can deliver a batch of decoded feed events.
///
/// Implemented by the HTTP feed client in the service binary and by
/// in-memory stubs in tests.
pub trait EventSource: Send + Sync {
    /// Fetch the next batch of events.
    fn fetch(&self) -> impl Future<Output = Result<Vec<FeedEvent>, SourceError>> + Send;
}

/// Lifecycle phase of a poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PollerStatus {
    /// Waiting for the next interval tick.
    Idle,
    /// A poll cycle is in flight.
    Polling,
    /// The most recent cycle failed to fetch or process.
    Failing,
    /// The poller was asked to stop and will submit no further batches.
    Stopped,
}

/// Shared status and counters for one poller.
///
/// Handed out as an [`Arc`] so the HTTP layer can report ingestion
/// health without reaching into the poll loop.
#[derive(Debug)]
pub struct PollerState {
    status: RwLock<PollerStatus>,
    polls_completed: AtomicU64,
    polls_failed: AtomicU64,
    events_processed: AtomicU64,
    events_failed: AtomicU64,
    last_poll_at: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<String>>,
    stop_requested: AtomicBool,
    started_at: DateTime<Utc>,
}

impl PollerState {
    /// Create a fresh state in the [`PollerStatus::Idle`] phase.
    pub fn new() -> Self {
        Self {
            status: RwLock::new(PollerStatus::Idle),
            polls_completed: AtomicU64::new(0),
            polls_failed: AtomicU64::new(0),
            events_processed: AtomicU64::new(0),
            events_failed: AtomicU64::new(0),
            last_poll_at: RwLock::new(None),
            last_error: RwLock::new(None),
            stop_requested: AtomicBool::new(false),
            started_at: Utc::now(),
        }
    }

    /// Ask the poll loop to stop before its next cycle.
    ///
    /// In-flight event applications finish; the loop just stops
    /// submitting new batches.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
    }

    /// Whether a stop has been requested.
    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Record a successful poll cycle.
    async fn record_success(&self, outcome: &BatchOutcome, at: DateTime<Utc>) {
        self.polls_completed.fetch_add(1, Ordering::AcqRel);
        self.events_processed
            .fetch_add(u64::from(outcome.processed), Ordering::AcqRel);
        self.events_failed
            .fetch_add(u64::from(outcome.failed), Ordering::AcqRel);
        *self.last_poll_at.write().await = Some(at);
        *self.last_error.write().await = None;
        *self.status.write().await = PollerStatus::Idle;
    }

    /// Record a failed poll cycle.
    async fn record_failure(&self, error: &SourceError, at: DateTime<Utc>) {
        self.polls_failed.fetch_add(1, Ordering::AcqRel);
        *self.last_poll_at.write().await = Some(at);
        *self.last_error.write().await = Some(error.to_string());
        *self.status.write().await = PollerStatus::Failing;
    }

    async fn set_status(&self, status: PollerStatus) {
        *self.status.write().await = status;
    }

    /// Take a serializable snapshot of the current state.
    pub async fn snapshot(&self) -> PollerSnapshot {
        PollerSnapshot {
            status: *self.status.read().await,
            polls_completed: self.polls_completed.load(Ordering::Acquire),
            polls_failed: self.polls_failed.load(Ordering::Acquire),
            events_processed: self.events_processed.load(Ordering::Acquire),
            events_failed: self.events_failed.load(Ordering::Acquire),
            last_poll_at: *self.last_poll_at.read().await,
            last_error: self.last_error.read().await.clone(),
            started_at: self.started_at,
        }
    }
}

impl Default for PollerState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of a [`PollerState`], served by the status
/// endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollerSnapshot {
    /// Current lifecycle phase.
    pub status: PollerStatus,
    /// Poll cycles that fetched and processed a batch.
    pub polls_completed: u64,
    /// Poll cycles that failed to fetch.
    pub polls_failed: u64,
    /// Events processed across all batches.
    pub events_processed: u64,
    /// Events failed across all batches.
    pub events_failed: u64,
    /// When the last cycle finished, successful or not.
    pub last_poll_at: Option<DateTime<Utc>>,
    /// The last fetch error, cleared on the next success.
    pub last_error: Option<String>,
    /// When this poller was created.
    pub started_at: DateTime<Utc>,
}

/// Periodically pulls the feed and reconciles it into the store.
#[derive(Debug)]
pub struct Poller<S, E> {
    coordinator: BatchCoordinator<S>,
    source: E,
    state: Arc<PollerState>,
    interval: Duration,
}

impl<S: EntityStore, E: EventSource> Poller<S, E> {
    /// Create a poller with a fresh [`PollerState`].
    pub fn new(store: Arc<S>, source: E, interval: Duration) -> Self {
        Self {
            coordinator: BatchCoordinator::new(store),
            source,
            state: Arc::new(PollerState::new()),
            interval,
        }
    }

    /// Handle to this poller's shared state.
    pub fn state(&self) -> Arc<PollerState> {
        Arc::clone(&self.state)
    }

    /// Run one poll cycle: fetch, process, record.
    pub async fn poll_once(&self) {
        self.state.set_status(PollerStatus::Polling).await;

        match self.source.fetch().await {
            Ok(events) => {
                tracing::debug!(count = events.len(), "fetched feed batch");
                let outcome = self.coordinator.process(&events).await;
                self.state.record_success(&outcome, Utc::now()).await;
            }
            Err(error) => {
                tracing::warn!(%error, "feed poll failed");
                self.state.record_failure(&error, Utc::now()).await;
            }
        }
    }

    /// Run the poll loop until a stop is requested via
    /// [`PollerState::request_stop`].
    ///
    /// Cycles run on a fixed interval; a cycle that overruns the
    /// interval delays the next one rather than stacking up.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(interval_secs = self.interval.as_secs(), "poller started");

        loop {
            ticker.tick().await;
            if self.state.stop_requested() {
                break;
            }
            self.poll_once().await;
        }

        self.state.set_status(PollerStatus::Stopped).await;
        tracing::info!("poller stopped");
    }
}

#[cfg(test)]
mod tests {
    // Tests panic on failure -- that is the correct behavior in test code.
    #![allow(clippy::unwrap_used, clippy::panic)]

    use chrono::TimeZone;
    use dinopark_types::DinoFed;

    use super::*;
    use crate::store::MemoryStore;

    /// Source stub returning a canned result per fetch.
    struct StubSource {
        result: Result<Vec<FeedEvent>, SourceError>,
    }

    impl EventSource for StubSource {
        async fn fetch(&self) -> Result<Vec<FeedEvent>, SourceError> {
            self.result.clone()
        }
    }

    fn fed_event(id: i64) -> FeedEvent {
        let time = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).single();
        FeedEvent::DinoFed(DinoFed {
            dinosaur_id: Some(id),
            park_id: Some(1),
            time,
        })
    }

    #[tokio::test]
    async fn successful_cycle_updates_counters_and_store() {
        let store = Arc::new(MemoryStore::new());
        let source = StubSource {
            result: Ok(vec![fed_event(1), fed_event(2)]),
        };
        let poller = Poller::new(Arc::clone(&store), source, Duration::from_secs(60));
        let state = poller.state();

        poller.poll_once().await;

        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.status, PollerStatus::Idle);
        assert_eq!(snapshot.polls_completed, 1);
        assert_eq!(snapshot.events_processed, 2);
        assert_eq!(snapshot.events_failed, 0);
        assert!(snapshot.last_poll_at.is_some());
        assert_eq!(snapshot.last_error, None);

        assert!(store.get_dinosaur(1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_fetch_marks_poller_failing() {
        let store = Arc::new(MemoryStore::new());
        let source = StubSource {
            result: Err(SourceError("connection refused".to_owned())),
        };
        let poller = Poller::new(store, source, Duration::from_secs(60));
        let state = poller.state();

        poller.poll_once().await;

        let snapshot = state.snapshot().await;
        assert_eq!(snapshot.status, PollerStatus::Failing);
        assert_eq!(snapshot.polls_failed, 1);
        assert_eq!(snapshot.polls_completed, 0);
        assert!(snapshot.last_error.is_some());
    }

    #[tokio::test]
    async fn stop_request_ends_the_loop() {
        let store = Arc::new(MemoryStore::new());
        let source = StubSource { result: Ok(vec![]) };
        let poller = Poller::new(store, source, Duration::from_millis(5));
        let state = poller.state();

        state.request_stop();
        // With the stop already requested the loop exits on its first
        // tick; a bounded timeout guards against regression.
        let run = tokio::time::timeout(Duration::from_secs(1), poller.run()).await;
        assert!(run.is_ok());

        assert_eq!(state.snapshot().await.status, PollerStatus::Stopped);
    }
}
