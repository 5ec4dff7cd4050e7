//! `PostgreSQL` implementation of the engine's entity-store interface.
//!
//! Every merge is a single `INSERT .. ON CONFLICT .. DO UPDATE`
//! statement -- never a read followed by a write -- so concurrent batch
//! runs cannot race each other into lost updates. The conditional
//! `WHERE` clauses and `GREATEST` merges implement last-writer-wins per
//! field group keyed on the event-carried timestamps:
//!
//! - identity writes land only when at least as new as the stored
//!   `identity_updated_at`;
//! - location writes likewise against `location_updated_at`;
//! - `last_fed_at` merges with `GREATEST`, the field being its own key;
//! - maintenance appends a history row keyed `(zone_code,
//!   performed_at)` (replays hit `DO NOTHING`) and advances the zone's
//!   latest timestamp with `GREATEST`, inside one transaction.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use dinopark_core::store::{EntityStore, StoreError};
use dinopark_types::{
    DietClass, Dinosaur, DinosaurIdentity, MaintenanceRecord, MaintenanceRecordId, ZoneCode,
};
use sqlx::PgPool;

/// Entity store backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a connection/query failure into the engine's store error.
fn unavailable(error: sqlx::Error) -> StoreError {
    StoreError::Unavailable(error.to_string())
}

/// Wire representation of a diet class in the `diet` column.
const fn diet_to_db(diet: DietClass) -> &'static str {
    match diet {
        DietClass::Carnivore => "carnivore",
        DietClass::Herbivore => "herbivore",
    }
}

/// Parse a `diet` column value back into a [`DietClass`].
fn diet_from_db(value: &str) -> Result<DietClass, StoreError> {
    match value {
        "carnivore" => Ok(DietClass::Carnivore),
        "herbivore" => Ok(DietClass::Herbivore),
        other => Err(StoreError::MalformedRow(format!(
            "unrecognized diet class {other:?}"
        ))),
    }
}

/// A row from the `dinosaurs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct DinosaurRow {
    external_id: i64,
    name: Option<String>,
    species: Option<String>,
    gender: Option<String>,
    diet: Option<String>,
    digestion_period_hours: Option<i32>,
    park_id: Option<i32>,
    current_zone: Option<String>,
    last_fed_at: Option<DateTime<Utc>>,
    identity_updated_at: Option<DateTime<Utc>>,
    location_updated_at: Option<DateTime<Utc>>,
}

impl DinosaurRow {
    /// Convert into the domain type, validating stored text columns.
    fn into_domain(self) -> Result<Dinosaur, StoreError> {
        let diet = self.diet.as_deref().map(diet_from_db).transpose()?;
        let current_zone = self
            .current_zone
            .as_deref()
            .map(ZoneCode::from_str)
            .transpose()
            .map_err(|e| StoreError::MalformedRow(e.to_string()))?;
        Ok(Dinosaur {
            external_id: self.external_id,
            name: self.name,
            species: self.species,
            gender: self.gender,
            diet,
            digestion_period_hours: self.digestion_period_hours,
            park_id: self.park_id,
            current_zone,
            last_fed_at: self.last_fed_at,
            identity_updated_at: self.identity_updated_at,
            location_updated_at: self.location_updated_at,
        })
    }
}

/// Columns selected for every dinosaur query.
const DINOSAUR_COLUMNS: &str = "external_id, name, species, gender, diet, \
     digestion_period_hours, park_id, current_zone, last_fed_at, \
     identity_updated_at, location_updated_at";

/// A row from the `maintenance_log` table.
#[derive(Debug, Clone, sqlx::FromRow)]
struct MaintenanceRow {
    id: uuid::Uuid,
    zone_code: String,
    performed_at: DateTime<Utc>,
    recorded_at: DateTime<Utc>,
}

impl MaintenanceRow {
    /// Convert into the domain type, validating the stored zone code.
    fn into_domain(self) -> Result<MaintenanceRecord, StoreError> {
        let zone = self
            .zone_code
            .parse()
            .map_err(|e: dinopark_types::ZoneCodeError| StoreError::MalformedRow(e.to_string()))?;
        Ok(MaintenanceRecord {
            id: MaintenanceRecordId::from(self.id),
            zone,
            performed_at: self.performed_at,
            recorded_at: self.recorded_at,
        })
    }
}

impl EntityStore for PgStore {
    async fn upsert_identity(
        &self,
        identity: &DinosaurIdentity,
        observed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO dinosaurs
              (external_id, name, species, gender, diet, digestion_period_hours, park_id, identity_updated_at)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
              ON CONFLICT (external_id) DO UPDATE SET
                name = EXCLUDED.name,
                species = EXCLUDED.species,
                gender = EXCLUDED.gender,
                diet = EXCLUDED.diet,
                digestion_period_hours = EXCLUDED.digestion_period_hours,
                park_id = EXCLUDED.park_id,
                identity_updated_at = EXCLUDED.identity_updated_at
              WHERE dinosaurs.identity_updated_at IS NULL
                 OR dinosaurs.identity_updated_at <= EXCLUDED.identity_updated_at",
        )
        .bind(identity.external_id)
        .bind(&identity.name)
        .bind(&identity.species)
        .bind(&identity.gender)
        .bind(diet_to_db(identity.diet))
        .bind(identity.digestion_period_hours)
        .bind(identity.park_id)
        .bind(observed_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        tracing::debug!(external_id = identity.external_id, "Upserted dinosaur identity");
        Ok(())
    }

    async fn upsert_location(
        &self,
        external_id: i64,
        zone: ZoneCode,
        observed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO dinosaurs (external_id, current_zone, location_updated_at)
              VALUES ($1, $2, $3)
              ON CONFLICT (external_id) DO UPDATE SET
                current_zone = EXCLUDED.current_zone,
                location_updated_at = EXCLUDED.location_updated_at
              WHERE dinosaurs.location_updated_at IS NULL
                 OR dinosaurs.location_updated_at <= EXCLUDED.location_updated_at",
        )
        .bind(external_id)
        .bind(zone.to_string())
        .bind(observed_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        tracing::debug!(external_id, %zone, "Upserted dinosaur location");
        Ok(())
    }

    async fn upsert_feeding(
        &self,
        external_id: i64,
        fed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r"INSERT INTO dinosaurs (external_id, last_fed_at)
              VALUES ($1, $2)
              ON CONFLICT (external_id) DO UPDATE SET
                last_fed_at = GREATEST(dinosaurs.last_fed_at, EXCLUDED.last_fed_at)",
        )
        .bind(external_id)
        .bind(fed_at)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        tracing::debug!(external_id, "Upserted dinosaur feeding");
        Ok(())
    }

    async fn remove_dinosaur(&self, external_id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query(r"DELETE FROM dinosaurs WHERE external_id = $1")
            .bind(external_id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;

        let existed = result.rows_affected() > 0;
        tracing::debug!(external_id, existed, "Removed dinosaur");
        Ok(existed)
    }

    async fn get_dinosaur(&self, external_id: i64) -> Result<Option<Dinosaur>, StoreError> {
        let row = sqlx::query_as::<_, DinosaurRow>(&format!(
            "SELECT {DINOSAUR_COLUMNS} FROM dinosaurs WHERE external_id = $1"
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?;

        row.map(DinosaurRow::into_domain).transpose()
    }

    async fn list_dinosaurs(&self) -> Result<Vec<Dinosaur>, StoreError> {
        let rows = sqlx::query_as::<_, DinosaurRow>(&format!(
            "SELECT {DINOSAUR_COLUMNS} FROM dinosaurs ORDER BY external_id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.into_iter().map(DinosaurRow::into_domain).collect()
    }

    async fn carnivores_in_zone(&self, zone: ZoneCode) -> Result<Vec<Dinosaur>, StoreError> {
        let rows = sqlx::query_as::<_, DinosaurRow>(&format!(
            "SELECT {DINOSAUR_COLUMNS} FROM dinosaurs \
             WHERE current_zone = $1 AND diet = 'carnivore' \
             ORDER BY external_id"
        ))
        .bind(zone.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.into_iter().map(DinosaurRow::into_domain).collect()
    }

    async fn record_maintenance(
        &self,
        zone: ZoneCode,
        performed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        sqlx::query(
            r"INSERT INTO maintenance_log (id, zone_code, performed_at)
              VALUES ($1, $2, $3)
              ON CONFLICT (zone_code, performed_at) DO NOTHING",
        )
        .bind(MaintenanceRecordId::new().into_inner())
        .bind(zone.to_string())
        .bind(performed_at)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            r"INSERT INTO zones (code, last_maintenance_at)
              VALUES ($1, $2)
              ON CONFLICT (code) DO UPDATE SET
                last_maintenance_at = GREATEST(zones.last_maintenance_at, EXCLUDED.last_maintenance_at)",
        )
        .bind(zone.to_string())
        .bind(performed_at)
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        tx.commit().await.map_err(unavailable)?;

        tracing::debug!(%zone, %performed_at, "Recorded zone maintenance");
        Ok(())
    }

    async fn last_maintenance(&self, zone: ZoneCode) -> Result<Option<DateTime<Utc>>, StoreError> {
        let row: Option<(Option<DateTime<Utc>>,)> =
            sqlx::query_as(r"SELECT last_maintenance_at FROM zones WHERE code = $1")
                .bind(zone.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(unavailable)?;

        Ok(row.and_then(|(at,)| at))
    }

    async fn all_last_maintenance(
        &self,
    ) -> Result<BTreeMap<ZoneCode, DateTime<Utc>>, StoreError> {
        let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(
            r"SELECT code, last_maintenance_at FROM zones
              WHERE last_maintenance_at IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.into_iter()
            .map(|(code, at)| {
                let zone: ZoneCode = code
                    .parse()
                    .map_err(|e: dinopark_types::ZoneCodeError| {
                        StoreError::MalformedRow(e.to_string())
                    })?;
                Ok((zone, at))
            })
            .collect()
    }

    async fn maintenance_history(
        &self,
        zone: ZoneCode,
    ) -> Result<Vec<MaintenanceRecord>, StoreError> {
        let rows = sqlx::query_as::<_, MaintenanceRow>(
            r"SELECT id, zone_code, performed_at, recorded_at
              FROM maintenance_log
              WHERE zone_code = $1
              ORDER BY performed_at DESC",
        )
        .bind(zone.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?;

        rows.into_iter().map(MaintenanceRow::into_domain).collect()
    }

    async fn seed_zones(&self, codes: &[ZoneCode]) -> Result<(), StoreError> {
        let codes_text: Vec<String> = codes.iter().map(ToString::to_string).collect();

        // Multi-row INSERT using UNNEST for batch efficiency.
        sqlx::query(
            r"INSERT INTO zones (code)
              SELECT * FROM UNNEST($1::TEXT[])
              ON CONFLICT (code) DO NOTHING",
        )
        .bind(&codes_text)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;

        tracing::info!(count = codes.len(), "Seeded zone grid");
        Ok(())
    }
}
