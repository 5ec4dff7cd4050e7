//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, running against the in-memory entity store.
//! This validates handler logic and routing without a live database.

#![allow(clippy::unwrap_used, clippy::panic, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{DateTime, TimeZone, Utc};
use dinopark_core::poller::PollerState;
use dinopark_core::store::{EntityStore, MemoryStore};
use dinopark_observer::router::build_router;
use dinopark_observer::state::AppState;
use dinopark_types::{DietClass, DinosaurIdentity, ZoneCode};
use serde_json::Value;
use tower::ServiceExt;

fn now_ish() -> DateTime<Utc> {
    Utc::now()
}

fn t(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).single().unwrap()
}

fn zone(code: &str) -> ZoneCode {
    code.parse().unwrap()
}

fn carnivore_identity(external_id: i64) -> DinosaurIdentity {
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

async fn make_state() -> Arc<AppState<MemoryStore>> {
    let store = Arc::new(MemoryStore::new());
    store.seed_zones(&ZoneCode::all()).await.unwrap();
    Arc::new(AppState::new(store))
}

async fn get_json(state: Arc<AppState<MemoryStore>>, uri: &str) -> (StatusCode, Value) {
    let response = build_router(state)
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn grid_has_416_zones_and_fresh_park_is_safe_but_due() {
    let state = make_state().await;
    let (status, json) = get_json(state, "/api/park/grid").await;

    assert_eq!(status, StatusCode::OK);
    let zones = json["zones"].as_array().unwrap();
    assert_eq!(zones.len(), 416);
    assert_eq!(zones[0]["code"], "A0");
    assert_eq!(zones[415]["code"], "Z15");
    // No carnivores anywhere: everything is safe. Nothing has ever
    // been maintained: everything is due.
    assert!(zones.iter().all(|z| z["safe"] == true));
    assert!(zones.iter().all(|z| z["maintenance_due"] == true));
}

#[tokio::test]
async fn hungry_carnivore_flips_its_zone_unsafe() {
    let state = make_state().await;
    state
        .store
        .upsert_identity(&carnivore_identity(7), t(1))
        .await
        .unwrap();
    state
        .store
        .upsert_location(7, zone("E10"), t(1))
        .await
        .unwrap();

    let (status, json) = get_json(Arc::clone(&state), "/api/zones/E10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["safe"], false);
    assert_eq!(json["carnivores"], 1);
    assert_eq!(json["maintenance_due"], true);

    // Feed it just now: the zone becomes safe for the digestion window.
    state.store.upsert_feeding(7, now_ish()).await.unwrap();
    let (_, json) = get_json(Arc::clone(&state), "/api/zones/E10").await;
    assert_eq!(json["safe"], true);

    // A neighboring zone is unaffected either way.
    let (_, json) = get_json(state, "/api/zones/E11").await;
    assert_eq!(json["safe"], true);
    assert_eq!(json["carnivores"], 0);
}

#[tokio::test]
async fn off_grid_zone_code_is_a_bad_request() {
    let state = make_state().await;
    let (status, json) = get_json(Arc::clone(&state), "/api/zones/Z16").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("Z16"));

    let (status, _) = get_json(state, "/api/zones/AA3").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dinosaur_endpoints_list_get_and_404() {
    let state = make_state().await;
    state
        .store
        .upsert_identity(&carnivore_identity(7), t(1))
        .await
        .unwrap();

    let (status, json) = get_json(Arc::clone(&state), "/api/dinosaurs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, json) = get_json(Arc::clone(&state), "/api/dinosaurs/7").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "Pounce");
    assert_eq!(json["diet"], "carnivore");

    let (status, _) = get_json(state, "/api/dinosaurs/404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn maintenance_history_is_served_newest_first() {
    let state = make_state().await;
    state
        .store
        .record_maintenance(zone("B2"), t(1))
        .await
        .unwrap();
    state
        .store
        .record_maintenance(zone("B2"), t(4))
        .await
        .unwrap();

    let (status, json) = get_json(state, "/api/zones/B2/maintenance").await;
    assert_eq!(status, StatusCode::OK);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0]["performed_at"].as_str().unwrap() > rows[1]["performed_at"].as_str().unwrap());
}

#[tokio::test]
async fn event_batch_post_reports_processed_failed_and_dropped() {
    let state = make_state().await;
    let body = serde_json::json!([
        {
            "kind": "dino_added",
            "dinosaur_id": 7,
            "name": "Pounce",
            "species": "Velociraptor",
            "gender": "female",
            "diet": "carnivore",
            "digestion_period_hours": 12,
            "park_id": 1,
            "time": "2026-03-01T08:00:00Z",
        },
        // Hard failure: maintenance without a zone code.
        {"kind": "maintenance_performed", "park_id": 1, "time": "2026-03-01T09:00:00Z"},
        // Unknown kind: dropped before processing, not a failure.
        {"kind": "dino_cloned", "dinosaur_id": 8},
    ]);

    let response = build_router(Arc::clone(&state))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/events")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(json["processed"], 1);
    assert_eq!(json["failed"], 1);
    assert_eq!(json["unknown_dropped"], 1);
    assert_eq!(json["errors"].as_array().unwrap().len(), 1);

    // The valid event landed despite its neighbors.
    assert!(state.store.get_dinosaur(7).await.unwrap().is_some());
}

#[tokio::test]
async fn ingest_status_requires_an_attached_poller() {
    let bare = make_state().await;
    let (status, _) = get_json(bare, "/api/ingest").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let store = Arc::new(MemoryStore::new());
    let poller_state = Arc::new(PollerState::new());
    let state = Arc::new(AppState::with_poller(store, poller_state));
    let (status, json) = get_json(state, "/api/ingest").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "idle");
    assert_eq!(json["polls_completed"], 0);
}
