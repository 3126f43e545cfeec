//! Reference data loading
//!
//! Database rows for the catalog tables and cache-first loaders used by the
//! catalog routes and by estimate pricing.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{postgres::PgRow, FromRow};
use uuid::Uuid;

use super::cache::keys;
use crate::app::AppState;
use crate::domain::{Coefficient, CoefficientKind, RoomParameter, WorkItem};
use crate::error::ApiError;
use crate::pricing::WorkCatalog;

pub const WORK_COLUMNS: &str =
    "id, name, category, unit, base_price, parameter_id, description, is_active, created_at, updated_at";
pub const COEFFICIENT_COLUMNS: &str =
    "id, name, value, category, kind, is_active, description, created_at, updated_at";
pub const ROOM_PARAMETER_COLUMNS: &str =
    "id, name, unit, description, is_active, created_at, updated_at";

/// Database row for a catalog work
#[derive(Debug, sqlx::FromRow)]
pub struct WorkRow {
    id: Uuid,
    name: String,
    category: String,
    unit: String,
    base_price: Decimal,
    parameter_id: Option<Uuid>,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<WorkRow> for WorkItem {
    fn from(row: WorkRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            category: row.category,
            unit: row.unit,
            base_price: row.base_price.to_f64().unwrap_or(0.0),
            parameter_id: row.parameter_id,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for a coefficient
#[derive(Debug, sqlx::FromRow)]
pub struct CoefficientRow {
    id: String,
    name: String,
    value: f64,
    category: String,
    kind: String,
    is_active: bool,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CoefficientRow> for Coefficient {
    fn from(row: CoefficientRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            value: row.value,
            category: row.category,
            kind: CoefficientKind::parse(&row.kind),
            is_active: row.is_active,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Database row for a room parameter
#[derive(Debug, sqlx::FromRow)]
pub struct RoomParameterRow {
    id: Uuid,
    name: String,
    unit: String,
    description: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoomParameterRow> for RoomParameter {
    fn from(row: RoomParameterRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            unit: row.unit,
            description: row.description,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Read a full table through the cache
async fn cached_list<R, T>(state: &AppState, key: &str, sql: &str) -> Result<Vec<T>, ApiError>
where
    R: for<'r> FromRow<'r, PgRow> + Send + Unpin + Into<T>,
    T: Serialize + DeserializeOwned,
{
    if let Some(cached) = state.cache.get::<Vec<T>>(key).await {
        return Ok(cached);
    }

    let rows = sqlx::query_as::<_, R>(sql).fetch_all(&state.db).await?;
    let list: Vec<T> = rows.into_iter().map(Into::into).collect();

    if let Err(e) = state.cache.set(key, &list).await {
        tracing::warn!(key = key, error = %e, "Failed to cache reference data");
    }

    Ok(list)
}

pub async fn load_works(state: &AppState) -> Result<Vec<WorkItem>, ApiError> {
    let sql = format!("SELECT {} FROM works ORDER BY category, name", WORK_COLUMNS);
    cached_list::<WorkRow, _>(state, keys::WORKS, &sql).await
}

pub async fn load_coefficients(state: &AppState) -> Result<Vec<Coefficient>, ApiError> {
    let sql = format!(
        "SELECT {} FROM coefficients ORDER BY category, name",
        COEFFICIENT_COLUMNS
    );
    cached_list::<CoefficientRow, _>(state, keys::COEFFICIENTS, &sql).await
}

pub async fn load_room_parameters(state: &AppState) -> Result<Vec<RoomParameter>, ApiError> {
    let sql = format!(
        "SELECT {} FROM room_parameters ORDER BY name",
        ROOM_PARAMETER_COLUMNS
    );
    cached_list::<RoomParameterRow, _>(state, keys::ROOM_PARAMETERS, &sql).await
}

/// The whole work catalog, indexed for pricing
pub async fn load_catalog(state: &AppState) -> Result<WorkCatalog, ApiError> {
    Ok(WorkCatalog::new(load_works(state).await?))
}
