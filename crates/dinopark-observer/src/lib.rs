//! Observer API server for the DinoPark monitor.
//!
//! A thin Axum layer over the core engine: zone safety and the
//! maintenance grid are computed live from the entity store on every
//! request (pull model -- answers are as fresh as the last completed
//! reconciliation), and a manual ingest endpoint lets operators backfill
//! event batches alongside the scheduled poller.
//!
//! The whole server is generic over the entity store, so API tests run
//! against the in-memory store with no database.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ObserverError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
