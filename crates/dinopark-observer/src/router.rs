//! Axum router construction for the Observer API.
//!
//! Assembles all routes into a single [`Router`] with CORS middleware
//! enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use dinopark_core::store::EntityStore;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /api/park/grid` -- all zones with safety + maintenance flags
/// - `GET /api/zones/{code}` -- single-zone safety detail
/// - `GET /api/zones/{code}/maintenance` -- maintenance history
/// - `GET /api/dinosaurs` -- list dinosaurs
/// - `GET /api/dinosaurs/{id}` -- single dinosaur
/// - `POST /api/events` -- manual event batch ingest
/// - `GET /api/ingest` -- poller status
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router<S: EntityStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index::<S>))
        // REST API
        .route("/api/park/grid", get(handlers::get_grid::<S>))
        .route("/api/zones/{code}", get(handlers::get_zone::<S>))
        .route(
            "/api/zones/{code}/maintenance",
            get(handlers::get_zone_maintenance::<S>),
        )
        .route("/api/dinosaurs", get(handlers::list_dinosaurs::<S>))
        .route("/api/dinosaurs/{id}", get(handlers::get_dinosaur::<S>))
        .route("/api/events", post(handlers::post_events::<S>))
        .route("/api/ingest", get(handlers::get_ingest_status::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
