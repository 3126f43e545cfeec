//! Work catalog routes
//!
//! Catalog CRUD plus CSV import/export.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, CsvAttachment, DataResponse, NoContent, Paginated, PaginationParams};
use crate::app::AppState;
use crate::domain::{
    CreateWorkRequest, ImportReport, UpdateWorkRequest, WorkFilter, WorkItem,
};
use crate::error::{ApiError, ApiResult};
use crate::services::cache::keys;
use crate::services::catalog::{load_works, WorkRow, WORK_COLUMNS};
use crate::services::catalog_csv;

fn to_decimal(price: f64) -> ApiResult<Decimal> {
    Decimal::from_f64(price)
        .map(|d| d.round_dp(2))
        .ok_or_else(|| ApiError::validation(&["base_price must be a non-negative number"]))
}

fn conflict_on_duplicate(e: sqlx::Error) -> ApiError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::Conflict("A work with this name already exists in the category".to_string())
        }
        _ => e.into(),
    }
}

fn matches_filter(work: &WorkItem, filter: &WorkFilter) -> bool {
    if filter.active_only.unwrap_or(false) && !work.is_active {
        return false;
    }
    if let Some(category) = &filter.category {
        if &work.category != category {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        if !work.name.to_lowercase().contains(&needle) {
            return false;
        }
    }
    true
}

/// GET /api/works
pub async fn list_works(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<WorkFilter>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<impl IntoResponse> {
    let works: Vec<WorkItem> = load_works(&state)
        .await?
        .into_iter()
        .filter(|w| matches_filter(w, &filter))
        .collect();

    Ok(Paginated::from_list(works, &pagination))
}

/// GET /api/works/:work_id
pub async fn get_work(
    State(state): State<Arc<AppState>>,
    Path(work_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let row = sqlx::query_as::<_, WorkRow>(&format!(
        "SELECT {} FROM works WHERE id = $1",
        WORK_COLUMNS
    ))
    .bind(work_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Work not found"))?;

    Ok(DataResponse::new(WorkItem::from(row)))
}

/// POST /api/works
pub async fn create_work(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateWorkRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate().map_err(|p| ApiError::validation(&p))?;

    tracing::info!(name = %req.name, category = %req.category, "Creating work");

    let row = sqlx::query_as::<_, WorkRow>(&format!(
        r#"
        INSERT INTO works (name, category, unit, base_price, parameter_id, description, is_active)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {}
        "#,
        WORK_COLUMNS
    ))
    .bind(req.name.trim())
    .bind(req.category.trim())
    .bind(req.unit.trim())
    .bind(to_decimal(req.base_price)?)
    .bind(req.parameter_id)
    .bind(&req.description)
    .bind(req.is_active)
    .fetch_one(&state.db)
    .await
    .map_err(conflict_on_duplicate)?;

    state.cache.invalidate(keys::WORKS).await;
    Ok(Created(WorkItem::from(row)))
}

/// PUT /api/works/:work_id
pub async fn update_work(
    State(state): State<Arc<AppState>>,
    Path(work_id): Path<Uuid>,
    Json(req): Json<UpdateWorkRequest>,
) -> ApiResult<impl IntoResponse> {
    req.validate().map_err(|p| ApiError::validation(&p))?;

    tracing::info!(work_id = %work_id, "Updating work");

    let base_price = req.base_price.map(to_decimal).transpose()?;

    let row = sqlx::query_as::<_, WorkRow>(&format!(
        r#"
        UPDATE works SET
            name = COALESCE($2, name),
            category = COALESCE($3, category),
            unit = COALESCE($4, unit),
            base_price = COALESCE($5, base_price),
            parameter_id = CASE WHEN $6 THEN $7 ELSE parameter_id END,
            description = CASE WHEN $8 THEN $9 ELSE description END,
            is_active = COALESCE($10, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        WORK_COLUMNS
    ))
    .bind(work_id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.category.as_deref().map(str::trim))
    .bind(req.unit.as_deref().map(str::trim))
    .bind(base_price)
    .bind(req.parameter_id.is_some())
    .bind(req.parameter_id.flatten())
    .bind(req.description.is_some())
    .bind(req.description.clone().flatten())
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await
    .map_err(conflict_on_duplicate)?
    .ok_or_else(|| ApiError::not_found("Work not found"))?;

    state.cache.invalidate(keys::WORKS).await;
    Ok(DataResponse::new(WorkItem::from(row)))
}

/// DELETE /api/works/:work_id
///
/// Estimates keep their copies of the line items; they are reported as
/// missing catalog entries afterwards.
pub async fn delete_work(
    State(state): State<Arc<AppState>>,
    Path(work_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    let result = sqlx::query("DELETE FROM works WHERE id = $1")
        .bind(work_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Work not found"));
    }

    tracing::info!(work_id = %work_id, "Deleted work");
    state.cache.invalidate(keys::WORKS).await;
    Ok(NoContent)
}

/// GET /api/works/export
pub async fn export_works(State(state): State<Arc<AppState>>) -> ApiResult<CsvAttachment> {
    let works = load_works(&state).await?;
    let body = catalog_csv::export(&works)?;

    tracing::info!(rows = works.len(), "Exported work catalog");
    Ok(CsvAttachment {
        filename: "works.csv",
        body,
    })
}

/// POST /api/works/import
///
/// Body is the CSV text. Rows are upserted by (name, category).
pub async fn import_works(
    State(state): State<Arc<AppState>>,
    body: String,
) -> ApiResult<impl IntoResponse> {
    let parsed = catalog_csv::parse(&body).map_err(|e| ApiError::bad_request(e.to_string()))?;

    let mut report = ImportReport {
        skipped: parsed.errors.len() as u32,
        errors: parsed.errors,
        ..Default::default()
    };

    let mut tx = state.db.begin().await?;
    for row in &parsed.rows {
        let inserted: bool = sqlx::query_scalar(
            r#"
            INSERT INTO works (name, category, unit, base_price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (name, category) DO UPDATE SET
                unit = EXCLUDED.unit,
                base_price = EXCLUDED.base_price,
                updated_at = NOW()
            RETURNING (xmax = 0)
            "#,
        )
        .bind(&row.name)
        .bind(&row.category)
        .bind(&row.unit)
        .bind(to_decimal(row.base_price)?)
        .fetch_one(&mut *tx)
        .await?;

        if inserted {
            report.created += 1;
        } else {
            report.updated += 1;
        }
    }
    tx.commit().await?;

    tracing::info!(
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        "Imported work catalog"
    );

    state.cache.invalidate(keys::WORKS).await;
    Ok(DataResponse::new(report))
}
