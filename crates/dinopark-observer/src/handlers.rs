//! REST API endpoint handlers for the Observer server.
//!
//! All reads are computed live from the entity store via the shared
//! [`AppState`] -- nothing is cached, so answers are as fresh as the
//! last completed reconciliation.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/park/grid` | All 416 zones with safety + maintenance flags |
//! | `GET` | `/api/zones/{code}` | Single-zone safety detail |
//! | `GET` | `/api/zones/{code}/maintenance` | Maintenance history for a zone |
//! | `GET` | `/api/dinosaurs` | List all dinosaurs |
//! | `GET` | `/api/dinosaurs/{id}` | Single dinosaur by external id |
//! | `POST` | `/api/events` | Apply a raw event batch (manual backfill) |
//! | `GET` | `/api/ingest` | Poller status and counters |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::response::Html;
use chrono::{DateTime, Utc};
use dinopark_core::poller::PollerSnapshot;
use dinopark_core::safety::{maintenance_due, zone_is_safe};
use dinopark_core::store::EntityStore;
use dinopark_types::{Dinosaur, FeedEvent, MaintenanceRecord, ZONE_COUNT, ZoneCode};

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response structs
// ---------------------------------------------------------------------------

/// One zone in the park grid response.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ZoneSummary {
    /// The zone code.
    pub code: ZoneCode,
    /// Whether the zone is currently safe to enter.
    pub safe: bool,
    /// Whether the zone's 30-day maintenance is due.
    pub maintenance_due: bool,
}

/// Response of the `GET /api/park/grid` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct GridResponse {
    /// Every zone on the grid, in enumeration order (`A0` .. `Z15`).
    pub zones: Vec<ZoneSummary>,
}

/// Response of the `GET /api/zones/{code}` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ZoneDetail {
    /// The zone code.
    pub code: ZoneCode,
    /// Whether the zone is currently safe to enter.
    pub safe: bool,
    /// Number of confirmed carnivores currently in the zone.
    pub carnivores: usize,
    /// When the zone was last maintained, if ever.
    pub last_maintenance_at: Option<DateTime<Utc>>,
    /// Whether the zone's 30-day maintenance is due.
    pub maintenance_due: bool,
}

/// Response of the `POST /api/events` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IngestResponse {
    /// Events applied, skipped as tolerated-malformed, or no-oped.
    pub processed: u32,
    /// Events rejected by validation or failed by the store.
    pub failed: u32,
    /// One cause per failed event, in batch order.
    pub errors: Vec<String>,
    /// Items dropped before processing because their kind is unknown.
    pub unknown_dropped: u32,
}

// ---------------------------------------------------------------------------
// Grid evaluation shared by the index page and the grid endpoint
// ---------------------------------------------------------------------------

/// Evaluate the full grid from two store reads.
///
/// Point queries per zone would cost 832 round-trips; instead the
/// resident list and the maintenance map are fetched once and the pure
/// safety rules run over them in memory.
async fn evaluate_grid<S: EntityStore>(
    state: &AppState<S>,
    now: DateTime<Utc>,
) -> Result<Vec<ZoneSummary>, ObserverError> {
    let dinosaurs = state.store.list_dinosaurs().await?;
    let maintenance = state.store.all_last_maintenance().await?;

    let mut residents: BTreeMap<ZoneCode, Vec<&Dinosaur>> = BTreeMap::new();
    for dino in &dinosaurs {
        if let Some(zone) = dino.current_zone {
            residents.entry(zone).or_default().push(dino);
        }
    }

    Ok(ZoneCode::all()
        .into_iter()
        .map(|code| ZoneSummary {
            code,
            safe: residents
                .get(&code)
                .is_none_or(|in_zone| zone_is_safe(in_zone.iter().copied(), now)),
            maintenance_due: maintenance_due(maintenance.get(&code).copied(), now),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing monitor status and API links.
pub async fn index<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Html<String>, ObserverError> {
    let now = Utc::now();
    let grid = evaluate_grid(&state, now).await?;
    let unsafe_zones = grid.iter().filter(|z| !z.safe).count();
    let due_zones = grid.iter().filter(|z| z.maintenance_due).count();
    let dinosaur_count = state.store.list_dinosaurs().await?.len();
    let poller_status = match &state.poller {
        Some(poller) => format!("{:?}", poller.snapshot().await.status),
        None => String::from("not attached"),
    };

    Ok(Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>DinoPark Monitor</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>DinoPark Monitor</h1>
    <p class="subtitle">Zone safety derived live from the park event feed</p>

    <p>Poller: <span class="status">{poller_status}</span></p>

    <div>
        <div class="metric">
            <div class="label">Zones</div>
            <div class="value">{ZONE_COUNT}</div>
        </div>
        <div class="metric">
            <div class="label">Unsafe</div>
            <div class="value">{unsafe_zones}</div>
        </div>
        <div class="metric">
            <div class="label">Maintenance due</div>
            <div class="value">{due_zones}</div>
        </div>
        <div class="metric">
            <div class="label">Dinosaurs</div>
            <div class="value">{dinosaur_count}</div>
        </div>
    </div>

    <hr>

    <h2>API Endpoints</h2>
    <ul>
        <li><a href="/api/park/grid">/api/park/grid</a> -- full grid with safety flags</li>
        <li>/api/zones/{{code}} -- single-zone safety detail</li>
        <li>/api/zones/{{code}}/maintenance -- maintenance history</li>
        <li><a href="/api/dinosaurs">/api/dinosaurs</a> -- list all dinosaurs</li>
        <li><a href="/api/ingest">/api/ingest</a> -- poller status</li>
    </ul>
</body>
</html>"#,
    )))
}

// ---------------------------------------------------------------------------
// Zone endpoints
// ---------------------------------------------------------------------------

/// `GET /api/park/grid` -- every zone with safety and maintenance flags.
pub async fn get_grid<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<GridResponse>, ObserverError> {
    let zones = evaluate_grid(&state, Utc::now()).await?;
    Ok(Json(GridResponse { zones }))
}

/// `GET /api/zones/{code}` -- live safety detail for one zone.
pub async fn get_zone<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
) -> Result<Json<ZoneDetail>, ObserverError> {
    let zone: ZoneCode = code
        .parse()
        .map_err(|_| ObserverError::InvalidZone(code.clone()))?;

    let now = Utc::now();
    // The safety verdict itself is fail-unsafe: a store failure inside
    // the evaluator reports unsafe instead of erroring the request.
    let safe = state.evaluator.evaluate_zone_at(zone, now).await;
    let carnivores = state.store.carnivores_in_zone(zone).await?.len();
    let last_maintenance_at = state.store.last_maintenance(zone).await?;

    Ok(Json(ZoneDetail {
        code: zone,
        safe,
        carnivores,
        last_maintenance_at,
        maintenance_due: maintenance_due(last_maintenance_at, now),
    }))
}

/// `GET /api/zones/{code}/maintenance` -- maintenance history, newest
/// first.
pub async fn get_zone_maintenance<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
) -> Result<Json<Vec<MaintenanceRecord>>, ObserverError> {
    let zone: ZoneCode = code
        .parse()
        .map_err(|_| ObserverError::InvalidZone(code.clone()))?;
    let history = state.store.maintenance_history(zone).await?;
    Ok(Json(history))
}

// ---------------------------------------------------------------------------
// Dinosaur endpoints
// ---------------------------------------------------------------------------

/// `GET /api/dinosaurs` -- all dinosaurs, ordered by external id.
pub async fn list_dinosaurs<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Dinosaur>>, ObserverError> {
    Ok(Json(state.store.list_dinosaurs().await?))
}

/// `GET /api/dinosaurs/{id}` -- one dinosaur by external id.
pub async fn get_dinosaur<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Path(external_id): Path<i64>,
) -> Result<Json<Dinosaur>, ObserverError> {
    state
        .store
        .get_dinosaur(external_id)
        .await?
        .map(Json)
        .ok_or_else(|| ObserverError::NotFound(format!("no dinosaur with id {external_id}")))
}

// ---------------------------------------------------------------------------
// Ingest endpoints
// ---------------------------------------------------------------------------

/// `POST /api/events` -- apply a raw event batch (manual backfill).
///
/// The body is a JSON array of feed items. Items of unknown kind are
/// dropped with a warning and counted separately; they never fail the
/// batch, so a feed that grows new event kinds keeps backfilling.
pub async fn post_events<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
    Json(values): Json<Vec<serde_json::Value>>,
) -> Result<Json<IngestResponse>, ObserverError> {
    let batch = FeedEvent::decode_batch(values);
    for reason in &batch.skipped {
        tracing::warn!(reason, "dropped undecodable feed item");
    }

    let outcome = state.coordinator.process(&batch.events).await;
    let unknown_dropped = u32::try_from(batch.skipped.len()).unwrap_or(u32::MAX);

    Ok(Json(IngestResponse {
        processed: outcome.processed,
        failed: outcome.failed,
        errors: outcome.errors,
        unknown_dropped,
    }))
}

/// `GET /api/ingest` -- status and counters of the scheduled poller.
pub async fn get_ingest_status<S: EntityStore>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<PollerSnapshot>, ObserverError> {
    match &state.poller {
        Some(poller) => Ok(Json(poller.snapshot().await)),
        None => Err(ObserverError::NotFound(
            "no poller attached to this process".to_owned(),
        )),
    }
}
