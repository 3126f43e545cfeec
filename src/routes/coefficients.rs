//! Coefficient routes

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::api::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::domain::{Coefficient, CreateCoefficientRequest, UpdateCoefficientRequest};
use crate::error::{ApiError, ApiResult};
use crate::pricing::coefficients::{selectable, validate_value};
use crate::services::cache::keys;
use crate::services::catalog::{load_coefficients, CoefficientRow, COEFFICIENT_COLUMNS};

fn require_text(value: &str, problem: &'static str, problems: &mut Vec<&'static str>) {
    if value.trim().is_empty() {
        problems.push(problem);
    }
}

/// GET /api/coefficients
pub async fn list_coefficients(
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    Ok(DataResponse::new(load_coefficients(&state).await?))
}

/// GET /api/coefficients/grouped
///
/// Active, user-selectable coefficients grouped by category.
pub async fn grouped_coefficients(
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    let coefficients = load_coefficients(&state).await?;
    Ok(DataResponse::new(selectable(&coefficients)))
}

/// POST /api/coefficients
pub async fn create_coefficient(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCoefficientRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut problems = Vec::new();
    require_text(&req.name, "name is required", &mut problems);
    require_text(&req.category, "category is required", &mut problems);
    if !problems.is_empty() {
        return Err(ApiError::validation(&problems));
    }
    let value = validate_value(req.value)?;

    tracing::info!(name = %req.name, kind = req.kind.as_str(), value, "Creating coefficient");

    let row = sqlx::query_as::<_, CoefficientRow>(&format!(
        r#"
        INSERT INTO coefficients (name, value, category, kind, description, is_active)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {}
        "#,
        COEFFICIENT_COLUMNS
    ))
    .bind(req.name.trim())
    .bind(value)
    .bind(req.category.trim())
    .bind(req.kind.as_str())
    .bind(&req.description)
    .bind(req.is_active)
    .fetch_one(&state.db)
    .await?;

    state.cache.invalidate(keys::COEFFICIENTS).await;
    Ok(Created(Coefficient::from(row)))
}

/// PUT /api/coefficients/:coefficient_id
pub async fn update_coefficient(
    State(state): State<Arc<AppState>>,
    Path(coefficient_id): Path<String>,
    Json(req): Json<UpdateCoefficientRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut problems = Vec::new();
    if let Some(name) = &req.name {
        require_text(name, "name must not be empty", &mut problems);
    }
    if let Some(category) = &req.category {
        require_text(category, "category must not be empty", &mut problems);
    }
    if !problems.is_empty() {
        return Err(ApiError::validation(&problems));
    }
    let value = req.value.map(validate_value).transpose()?;

    let row = sqlx::query_as::<_, CoefficientRow>(&format!(
        r#"
        UPDATE coefficients SET
            name = COALESCE($2, name),
            value = COALESCE($3, value),
            category = COALESCE($4, category),
            kind = COALESCE($5, kind),
            description = CASE WHEN $6 THEN $7 ELSE description END,
            is_active = COALESCE($8, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        COEFFICIENT_COLUMNS
    ))
    .bind(&coefficient_id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(value)
    .bind(req.category.as_deref().map(str::trim))
    .bind(req.kind.map(|k| k.as_str()))
    .bind(req.description.is_some())
    .bind(req.description.clone().flatten())
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Coefficient not found"))?;

    tracing::info!(coefficient_id = %coefficient_id, "Updated coefficient");
    state.cache.invalidate(keys::COEFFICIENTS).await;
    Ok(DataResponse::new(Coefficient::from(row)))
}

/// DELETE /api/coefficients/:coefficient_id
///
/// Estimates that still select the id simply stop applying it.
pub async fn delete_coefficient(
    State(state): State<Arc<AppState>>,
    Path(coefficient_id): Path<String>,
) -> ApiResult<NoContent> {
    let result = sqlx::query("DELETE FROM coefficients WHERE id = $1")
        .bind(&coefficient_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Coefficient not found"));
    }

    tracing::info!(coefficient_id = %coefficient_id, "Deleted coefficient");
    state.cache.invalidate(keys::COEFFICIENTS).await;
    Ok(NoContent)
}
