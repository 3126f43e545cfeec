//! Room parameter routes

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, NoContent};
use crate::app::AppState;
use crate::domain::{CreateRoomParameterRequest, RoomParameter, UpdateRoomParameterRequest};
use crate::error::{ApiError, ApiResult};
use crate::services::cache::keys;
use crate::services::catalog::{load_room_parameters, RoomParameterRow, ROOM_PARAMETER_COLUMNS};

/// GET /api/room-parameters
pub async fn list_room_parameters(
    State(state): State<Arc<AppState>>,
) -> ApiResult<impl IntoResponse> {
    Ok(DataResponse::new(load_room_parameters(&state).await?))
}

/// POST /api/room-parameters
pub async fn create_room_parameter(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRoomParameterRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut problems = Vec::new();
    if req.name.trim().is_empty() {
        problems.push("name is required");
    }
    if req.unit.trim().is_empty() {
        problems.push("unit is required");
    }
    if !problems.is_empty() {
        return Err(ApiError::validation(&problems));
    }

    let row = sqlx::query_as::<_, RoomParameterRow>(&format!(
        r#"
        INSERT INTO room_parameters (name, unit, description, is_active)
        VALUES ($1, $2, $3, $4)
        RETURNING {}
        "#,
        ROOM_PARAMETER_COLUMNS
    ))
    .bind(req.name.trim())
    .bind(req.unit.trim())
    .bind(&req.description)
    .bind(req.is_active)
    .fetch_one(&state.db)
    .await?;

    let parameter = RoomParameter::from(row);
    tracing::info!(parameter_id = %parameter.id, name = %parameter.name, "Created room parameter");

    state.cache.invalidate(keys::ROOM_PARAMETERS).await;
    Ok(Created(parameter))
}

/// PUT /api/room-parameters/:parameter_id
pub async fn update_room_parameter(
    State(state): State<Arc<AppState>>,
    Path(parameter_id): Path<Uuid>,
    Json(req): Json<UpdateRoomParameterRequest>,
) -> ApiResult<impl IntoResponse> {
    let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
    let mut problems = Vec::new();
    if blank(&req.name) {
        problems.push("name must not be empty");
    }
    if blank(&req.unit) {
        problems.push("unit must not be empty");
    }
    if !problems.is_empty() {
        return Err(ApiError::validation(&problems));
    }

    let row = sqlx::query_as::<_, RoomParameterRow>(&format!(
        r#"
        UPDATE room_parameters SET
            name = COALESCE($2, name),
            unit = COALESCE($3, unit),
            description = CASE WHEN $4 THEN $5 ELSE description END,
            is_active = COALESCE($6, is_active),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        ROOM_PARAMETER_COLUMNS
    ))
    .bind(parameter_id)
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.unit.as_deref().map(str::trim))
    .bind(req.description.is_some())
    .bind(req.description.clone().flatten())
    .bind(req.is_active)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Room parameter not found"))?;

    state.cache.invalidate(keys::ROOM_PARAMETERS).await;
    Ok(DataResponse::new(RoomParameter::from(row)))
}

/// DELETE /api/room-parameters/:parameter_id
///
/// Works linked to the parameter are unlinked by the foreign key.
pub async fn delete_room_parameter(
    State(state): State<Arc<AppState>>,
    Path(parameter_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    let result = sqlx::query("DELETE FROM room_parameters WHERE id = $1")
        .bind(parameter_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Room parameter not found"));
    }

    tracing::info!(parameter_id = %parameter_id, "Deleted room parameter");
    state.cache.invalidate(keys::ROOM_PARAMETERS).await;
    // works embed parameter_id
    state.cache.invalidate(keys::WORKS).await;
    Ok(NoContent)
}
