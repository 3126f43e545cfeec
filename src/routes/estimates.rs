//! Estimate routes
//!
//! Estimates are stored as one JSON document per row. Every write goes
//! through the pricing engine: the document is edited in memory, repriced and
//! persisted together with its denormalised totals in one transaction.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use sqlx::types::Json as SqlJson;
use sqlx::{Postgres, Transaction};
use std::iter;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, NoContent, Paginated, PaginationParams};
use crate::app::AppState;
use crate::domain::{
    AddItemRequest, Coefficient, CreateEstimateRequest, EstimateDocument, EstimateListItem,
    EstimateResponse, EstimateTotals, EstimateType, MoveBlockRequest, ReplaceEstimateRequest,
    SetParameterRequest, SummaryResponse, UpdateItemRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::pricing::adjustment::{resolve_price_sources, set_unit_price};
use crate::pricing::aggregation::{apply_block_totals, price_estimate, summarize_rooms, EstimatePricing};
use crate::pricing::blocks::{duplicate_titles, find_item_mut, insert_from_catalog, move_block};
use crate::pricing::parameters::{new_line_item, propagate, set_parameter_value, set_quantity};
use crate::pricing::scope::{scope_mut, ScopeMut};
use crate::pricing::{non_negative, CoefficientResolver, MissingCatalogEntry, PricingError, WorkCatalog};
use crate::services::catalog::{load_catalog, load_coefficients, load_room_parameters};

const ESTIMATE_COLUMNS: &str = "id, name, client_id, document, works_price, materials_price, grand_total, created_at, updated_at";

/// Database row for an estimate
#[derive(Debug, sqlx::FromRow)]
struct EstimateRow {
    id: Uuid,
    name: String,
    client_id: Option<Uuid>,
    document: SqlJson<EstimateDocument>,
    works_price: f64,
    materials_price: f64,
    grand_total: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl EstimateRow {
    fn totals(&self) -> EstimateTotals {
        EstimateTotals {
            works_price: self.works_price,
            materials_price: self.materials_price,
            grand_total: self.grand_total,
        }
    }
}

/// Database row for the estimate listing
#[derive(Debug, sqlx::FromRow)]
struct EstimateListRow {
    id: Uuid,
    name: String,
    client_id: Option<Uuid>,
    estimate_type: String,
    works_price: f64,
    materials_price: f64,
    grand_total: f64,
    updated_at: DateTime<Utc>,
}

impl From<EstimateListRow> for EstimateListItem {
    fn from(row: EstimateListRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            client_id: row.client_id,
            estimate_type: EstimateType::parse(&row.estimate_type),
            totals: EstimateTotals {
                works_price: row.works_price,
                materials_price: row.materials_price,
                grand_total: row.grand_total,
            },
            updated_at: row.updated_at,
        }
    }
}

/// Reference data an estimate is priced against
struct PricingContext {
    catalog: WorkCatalog,
    coefficients: Vec<Coefficient>,
}

impl PricingContext {
    async fn load(state: &AppState) -> ApiResult<Self> {
        let (catalog, coefficients) = tokio::join!(load_catalog(state), load_coefficients(state));
        Ok(Self {
            catalog: catalog?,
            coefficients: coefficients?,
        })
    }
}

/// Result of repricing a document
struct Repriced {
    pricing: EstimatePricing,
    missing: Vec<MissingCatalogEntry>,
}

/// Tag price sources, price every block and write block totals back.
/// Item totals stay `quantity × unit_price`, so repricing is idempotent.
fn reprice(document: &mut EstimateDocument, ctx: &PricingContext) -> Repriced {
    let missing = resolve_price_sources(document, &ctx.catalog);
    let resolver = CoefficientResolver::new(
        &ctx.coefficients,
        &document.coefficients,
        &document.coefficient_settings,
    );
    let pricing = price_estimate(document, &resolver);
    apply_block_totals(document, &pricing);
    Repriced { pricing, missing }
}

fn to_response(row: EstimateRow, repriced: Repriced) -> EstimateResponse {
    EstimateResponse {
        id: row.id,
        name: row.name,
        client_id: row.client_id,
        totals: repriced.pricing.totals(),
        document: row.document.0,
        pricing: repriced.pricing,
        missing_catalog_entries: repriced.missing,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

async fn fetch_for_update(
    tx: &mut Transaction<'_, Postgres>,
    estimate_id: Uuid,
) -> ApiResult<EstimateRow> {
    sqlx::query_as::<_, EstimateRow>(&format!(
        "SELECT {} FROM estimates WHERE id = $1 FOR UPDATE",
        ESTIMATE_COLUMNS
    ))
    .bind(estimate_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| ApiError::not_found("Estimate not found"))
}

async fn save(
    tx: &mut Transaction<'_, Postgres>,
    estimate_id: Uuid,
    name: &str,
    client_id: Option<Uuid>,
    document: &EstimateDocument,
    totals: EstimateTotals,
) -> ApiResult<EstimateRow> {
    let row = sqlx::query_as::<_, EstimateRow>(&format!(
        r#"
        UPDATE estimates SET
            name = $2,
            client_id = $3,
            estimate_type = $4,
            document = $5,
            works_price = $6,
            materials_price = $7,
            grand_total = $8,
            updated_at = NOW()
        WHERE id = $1
        RETURNING {}
        "#,
        ESTIMATE_COLUMNS
    ))
    .bind(estimate_id)
    .bind(name)
    .bind(client_id)
    .bind(document.estimate_type.as_str())
    .bind(SqlJson(document))
    .bind(totals.works_price)
    .bind(totals.materials_price)
    .bind(totals.grand_total)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row)
}

/// Load an estimate, apply `edit` to its document, reprice and persist.
async fn edit_estimate<F>(
    state: &AppState,
    estimate_id: Uuid,
    edit: F,
) -> ApiResult<EstimateResponse>
where
    F: FnOnce(&mut EstimateDocument, &PricingContext) -> Result<(), ApiError>,
{
    let ctx = PricingContext::load(state).await?;

    let mut tx = state.db.begin().await?;
    let row = fetch_for_update(&mut tx, estimate_id).await?;
    let mut document = row.document.0;

    // tag legacy items before the edit reclassifies anything
    resolve_price_sources(&mut document, &ctx.catalog);
    edit(&mut document, &ctx)?;
    // the edit may have reset prices to catalog
    document.sync_manual_prices();

    let repriced = reprice(&mut document, &ctx);
    let saved = save(
        &mut tx,
        estimate_id,
        &row.name,
        row.client_id,
        &document,
        repriced.pricing.totals(),
    )
    .await?;
    tx.commit().await?;

    Ok(to_response(saved, repriced))
}

/// Reject documents the engine would misprice.
///
/// Rooms estimates are priced room by room, so top-level blocks there would
/// be stored but never counted.
fn validate_document(document: &EstimateDocument) -> Result<(), PricingError> {
    if document.estimate_type == EstimateType::Rooms
        && (!document.works_blocks.is_empty() || !document.materials_block.items.is_empty())
    {
        return Err(PricingError::TopLevelBlocksInRoomsEstimate);
    }
    for item in document.all_blocks().flat_map(|b| b.items.iter()) {
        non_negative("quantity", item.quantity)?;
        non_negative("unit_price", item.unit_price)?;
    }
    for value in document
        .room_parameters
        .iter()
        .chain(document.rooms.iter().flat_map(|r| r.room_parameters.iter()))
    {
        non_negative("value", value.value)?;
    }
    Ok(())
}

fn warn_duplicate_titles(estimate_id: Uuid, document: &EstimateDocument) {
    let groups = iter::once(&document.works_blocks)
        .chain(document.rooms.iter().map(|r| &r.works_blocks));
    for blocks in groups {
        let duplicates = duplicate_titles(blocks);
        if !duplicates.is_empty() {
            tracing::warn!(
                estimate_id = %estimate_id,
                titles = ?duplicates,
                "Estimate has blocks sharing a title"
            );
        }
    }
}

/// GET /api/estimates
pub async fn list_estimates(
    State(state): State<Arc<AppState>>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<impl IntoResponse> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM estimates")
        .fetch_one(&state.db)
        .await?;

    let rows = sqlx::query_as::<_, EstimateListRow>(
        r#"
        SELECT id, name, client_id, estimate_type, works_price, materials_price, grand_total, updated_at
        FROM estimates
        ORDER BY updated_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(pagination.limit() as i64)
    .bind(pagination.offset() as i64)
    .fetch_all(&state.db)
    .await?;

    let data: Vec<EstimateListItem> = rows.into_iter().map(Into::into).collect();
    Ok(Paginated::new(data, &pagination, total as u64))
}

/// POST /api/estimates
pub async fn create_estimate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateEstimateRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.name.trim().is_empty() {
        return Err(ApiError::validation(&["name is required"]));
    }

    let document = EstimateDocument::empty(req.estimate_type);

    let row = sqlx::query_as::<_, EstimateRow>(&format!(
        r#"
        INSERT INTO estimates (name, client_id, estimate_type, document)
        VALUES ($1, $2, $3, $4)
        RETURNING {}
        "#,
        ESTIMATE_COLUMNS
    ))
    .bind(req.name.trim())
    .bind(req.client_id)
    .bind(req.estimate_type.as_str())
    .bind(SqlJson(&document))
    .fetch_one(&state.db)
    .await?;

    tracing::info!(
        estimate_id = %row.id,
        estimate_type = req.estimate_type.as_str(),
        "Created estimate"
    );

    let repriced = Repriced {
        pricing: EstimatePricing::default(),
        missing: Vec::new(),
    };
    Ok(Created(to_response(row, repriced)))
}

/// GET /api/estimates/:estimate_id
///
/// Prices are recomputed against the current catalog and coefficients but
/// nothing is written back.
pub async fn get_estimate(
    State(state): State<Arc<AppState>>,
    Path(estimate_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let ctx = PricingContext::load(&state).await?;

    let mut row = sqlx::query_as::<_, EstimateRow>(&format!(
        "SELECT {} FROM estimates WHERE id = $1",
        ESTIMATE_COLUMNS
    ))
    .bind(estimate_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Estimate not found"))?;

    let stored = row.totals();
    let repriced = reprice(&mut row.document.0, &ctx);
    if repriced.pricing.totals() != stored {
        tracing::debug!(
            estimate_id = %estimate_id,
            stored = stored.grand_total,
            current = repriced.pricing.grand_total,
            "Stored totals are stale"
        );
    }

    Ok(DataResponse::new(to_response(row, repriced)))
}

/// PUT /api/estimates/:estimate_id
///
/// Replaces the whole document. Client-side totals are ignored and
/// recomputed before the row is written.
pub async fn replace_estimate(
    State(state): State<Arc<AppState>>,
    Path(estimate_id): Path<Uuid>,
    Json(req): Json<ReplaceEstimateRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::validation(&["name must not be empty"]));
    }
    validate_document(&req.document)?;
    warn_duplicate_titles(estimate_id, &req.document);

    let ctx = PricingContext::load(&state).await?;

    let mut tx = state.db.begin().await?;
    let row = fetch_for_update(&mut tx, estimate_id).await?;

    let mut document = req.document;
    let repriced = reprice(&mut document, &ctx);

    let name = req.name.as_deref().map(str::trim).unwrap_or(&row.name);
    let saved = save(
        &mut tx,
        estimate_id,
        name,
        req.client_id.or(row.client_id),
        &document,
        repriced.pricing.totals(),
    )
    .await?;
    tx.commit().await?;

    tracing::info!(
        estimate_id = %estimate_id,
        grand_total = repriced.pricing.grand_total,
        "Replaced estimate"
    );

    Ok(DataResponse::new(to_response(saved, repriced)))
}

/// DELETE /api/estimates/:estimate_id
pub async fn delete_estimate(
    State(state): State<Arc<AppState>>,
    Path(estimate_id): Path<Uuid>,
) -> ApiResult<NoContent> {
    let result = sqlx::query("DELETE FROM estimates WHERE id = $1")
        .bind(estimate_id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Estimate not found"));
    }

    tracing::info!(estimate_id = %estimate_id, "Deleted estimate");
    Ok(NoContent)
}

/// GET /api/estimates/:estimate_id/summary
///
/// Read-only merge of all rooms of a rooms estimate.
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Path(estimate_id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let ctx = PricingContext::load(&state).await?;

    let row = sqlx::query_as::<_, EstimateRow>(&format!(
        "SELECT {} FROM estimates WHERE id = $1",
        ESTIMATE_COLUMNS
    ))
    .bind(estimate_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Estimate not found"))?;

    let mut document = row.document.0;
    if document.estimate_type != EstimateType::Rooms {
        return Err(ApiError::bad_request(
            "Summary is only available for rooms estimates",
        ));
    }

    let repriced = reprice(&mut document, &ctx);
    let resolver = CoefficientResolver::new(
        &ctx.coefficients,
        &document.coefficients,
        &document.coefficient_settings,
    );
    let summary = summarize_rooms(&document.rooms, &resolver);

    Ok(DataResponse::new(SummaryResponse {
        estimate_id,
        works: summary.works,
        materials: summary.materials,
        totals: repriced.pricing.totals(),
    }))
}

/// PUT /api/estimates/:estimate_id/parameters
///
/// Stores a parameter value for the estimate (or one room) and pushes it
/// into the quantities of every linked item in the same scope.
pub async fn set_parameter(
    State(state): State<Arc<AppState>>,
    Path(estimate_id): Path<Uuid>,
    Json(req): Json<SetParameterRequest>,
) -> ApiResult<impl IntoResponse> {
    let parameters = load_room_parameters(&state).await?;
    if !parameters.iter().any(|p| p.id == req.parameter_id) {
        return Err(ApiError::not_found("Room parameter not found"));
    }

    let policy = state.settings.quantity_override_policy;

    let response = edit_estimate(&state, estimate_id, |document, ctx| {
        let ScopeMut {
            works_blocks,
            materials_block,
            room_parameters,
            manually_edited_quantities,
        } = scope_mut(document, req.room_id.as_deref())?;

        set_parameter_value(room_parameters, req.parameter_id, req.value)?;
        let updated = propagate(
            works_blocks.iter_mut().chain(iter::once(materials_block)),
            &ctx.catalog,
            req.parameter_id,
            req.value,
            manually_edited_quantities,
            policy,
        );

        tracing::info!(
            estimate_id = %estimate_id,
            parameter_id = %req.parameter_id,
            value = req.value,
            updated,
            "Set room parameter"
        );
        Ok(())
    })
    .await?;

    Ok(DataResponse::new(response))
}

/// POST /api/estimates/:estimate_id/items
///
/// Adds a catalog work. Without a block id it lands in the block named after
/// the work's category, which is created on demand.
pub async fn add_item(
    State(state): State<Arc<AppState>>,
    Path(estimate_id): Path<Uuid>,
    Json(req): Json<AddItemRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = edit_estimate(&state, estimate_id, |document, ctx| {
        let work = ctx.catalog.require(&req.work_id)?;
        let scope = scope_mut(document, req.room_id.as_deref())?;

        let item_id = match req.block_id.as_deref() {
            Some(id) if id == scope.materials_block.id => {
                let item = new_line_item(work, scope.room_parameters);
                let item_id = item.id.clone();
                scope.materials_block.items.push(item);
                item_id
            }
            block_id => {
                insert_from_catalog(scope.works_blocks, work, scope.room_parameters, block_id)?
                    .id
                    .clone()
            }
        };

        tracing::info!(
            estimate_id = %estimate_id,
            work_id = %req.work_id,
            item_id = %item_id,
            "Added catalog work"
        );
        Ok(())
    })
    .await?;

    Ok(Created(response))
}

/// PATCH /api/estimates/:estimate_id/items/:item_id
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path((estimate_id, item_id)): Path<(Uuid, String)>,
    Json(req): Json<UpdateItemRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.unit_price.is_none() && req.quantity.is_none() {
        return Err(ApiError::validation(&["unit_price or quantity is required"]));
    }

    let response = edit_estimate(&state, estimate_id, |document, ctx| {
        let ScopeMut {
            works_blocks,
            materials_block,
            room_parameters,
            manually_edited_quantities,
        } = scope_mut(document, req.room_id.as_deref())?;

        let item = find_item_mut(
            works_blocks.iter_mut().chain(iter::once(materials_block)),
            &item_id,
        )
        .ok_or_else(|| PricingError::UnknownItem(item_id.clone()))?;

        if let Some(unit_price) = req.unit_price {
            set_unit_price(item, unit_price, &ctx.catalog)?;
        }
        if let Some(quantity) = req.quantity {
            set_quantity(
                item,
                quantity,
                &ctx.catalog,
                room_parameters,
                manually_edited_quantities,
            )?;
        }

        tracing::info!(
            estimate_id = %estimate_id,
            item_id = %item_id,
            manual_price = item.is_manual_price(),
            "Updated line item"
        );
        Ok(())
    })
    .await?;

    Ok(DataResponse::new(response))
}

/// POST /api/estimates/:estimate_id/blocks/:block_id/move
pub async fn move_estimate_block(
    State(state): State<Arc<AppState>>,
    Path((estimate_id, block_id)): Path<(Uuid, String)>,
    Json(req): Json<MoveBlockRequest>,
) -> ApiResult<impl IntoResponse> {
    let response = edit_estimate(&state, estimate_id, |document, _| {
        let scope = scope_mut(document, req.room_id.as_deref())?;
        move_block(scope.works_blocks, &block_id, req.position)?;
        Ok(())
    })
    .await?;

    Ok(DataResponse::new(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CoefficientKind, CoefficientTarget, Room, RoomParameterValue, WorkBlock, WorkLineItem,
    };
    use crate::pricing::fixtures::{block, coefficient, item, manual_item, work};

    fn context(works: Vec<crate::domain::WorkItem>, coefficients: Vec<Coefficient>) -> PricingContext {
        PricingContext {
            catalog: WorkCatalog::new(works),
            coefficients,
        }
    }

    fn catalog_item(id: &str, work: &crate::domain::WorkItem, quantity: f64) -> WorkLineItem {
        let mut line = item(id, work.base_price, quantity);
        line.work_id = Some(work.id);
        line
    }

    #[test]
    fn reprice_writes_block_totals_and_keeps_item_totals() {
        let screed = work("Стяжка пола", "Черновые работы (Пол)", 100.0, None);
        let line = catalog_item("i1", &screed, 20.0);
        let ctx = context(
            vec![screed],
            vec![coefficient("k1", 1.2, CoefficientKind::Normal)],
        );
        let mut document = EstimateDocument::empty(EstimateType::Apartment);
        document.works_blocks = vec![block("b1", "Черновые работы (Пол)", vec![line])];
        document.coefficients = vec!["k1".to_string()];

        let first = reprice(&mut document, &ctx);
        assert_eq!(first.pricing.grand_total, 2400.0);
        assert_eq!(document.works_blocks[0].total_price, 2400.0);
        assert_eq!(document.works_blocks[0].items[0].total_price, 2000.0);

        let second = reprice(&mut document, &ctx);
        assert_eq!(second.pricing, first.pricing);
    }

    #[test]
    fn reprice_reports_missing_catalog_entries() {
        let ctx = context(vec![], vec![]);
        let mut document = EstimateDocument::empty(EstimateType::Apartment);
        let mut orphan = item("i1", 50.0, 2.0);
        orphan.work_id = Some(Uuid::new_v4());
        document.works_blocks = vec![block("b1", "Вентиляция", vec![orphan])];

        let repriced = reprice(&mut document, &ctx);
        assert_eq!(repriced.missing.len(), 1);
        assert_eq!(repriced.missing[0].item_id, "i1");
        assert_eq!(repriced.pricing.works_price, 100.0);
    }

    #[test]
    fn materials_only_take_global_coefficients() {
        let vents = work("Монтаж вентиляции", "Прочие работы", 10.0, None);
        let line = catalog_item("i1", &vents, 1.0);
        let ctx = context(
            vec![vents],
            vec![
                coefficient("g", 2.0, CoefficientKind::Normal),
                coefficient("b", 3.0, CoefficientKind::Normal),
            ],
        );
        let mut document = EstimateDocument::empty(EstimateType::Apartment);
        document.works_blocks = vec![block("b1", "Прочие работы", vec![line])];
        document.materials_block.items = vec![manual_item("m1", 10.0, 1.0)];
        document.coefficients = vec!["g".to_string(), "b".to_string()];
        document
            .coefficient_settings
            .insert("b".to_string(), CoefficientTarget::Blocks(vec!["b1".to_string()]));

        let repriced = reprice(&mut document, &ctx);
        // works: 10 × 2 × 3; manual materials take no normal coefficients
        assert_eq!(repriced.pricing.works_price, 60.0);
        assert_eq!(repriced.pricing.materials_price, 10.0);
        assert_eq!(repriced.pricing.grand_total, 70.0);
    }

    #[test]
    fn reprice_distrusts_stored_catalog_tags() {
        let tiling = work("Укладка плитки", "Чистовые работы (Пол)", 1000.0, None);
        let mut diverged = catalog_item("i1", &tiling, 2.0);
        diverged.unit_price = 1100.0;
        let free_text = item("free", 500.0, 1.0);
        let ctx = context(
            vec![tiling],
            vec![
                coefficient("complexity", 1.5, CoefficientKind::Normal),
                coefficient("premium", 1.2, CoefficientKind::Final),
            ],
        );

        let mut document = EstimateDocument::empty(EstimateType::Apartment);
        document.works_blocks = vec![block("b1", "Чистовые работы (Пол)", vec![diverged, free_text])];
        document.manual_prices = vec!["i1".to_string()];
        document.coefficients = vec!["complexity".to_string(), "premium".to_string()];

        let repriced = reprice(&mut document, &ctx);
        // 1100 × 1.2 × 2 + 500 × 1.2
        assert_eq!(repriced.pricing.works_price, 3240.0);
        assert_eq!(document.manual_prices, vec!["i1".to_string(), "free".to_string()]);
    }

    #[test]
    fn price_reset_to_catalog_drops_manual_flag() {
        let tiling = work("Укладка плитки", "Чистовые работы (Пол)", 1000.0, None);
        let mut diverged = catalog_item("i1", &tiling, 1.0);
        diverged.unit_price = 1100.0;
        let ctx = context(
            vec![tiling],
            vec![coefficient("complexity", 1.5, CoefficientKind::Normal)],
        );

        let mut document = EstimateDocument::empty(EstimateType::Apartment);
        document.works_blocks = vec![block("b1", "Чистовые работы (Пол)", vec![diverged])];
        document.coefficients = vec!["complexity".to_string()];
        resolve_price_sources(&mut document, &ctx.catalog);
        assert_eq!(document.manual_prices, vec!["i1".to_string()]);

        let line = &mut document.works_blocks[0].items[0];
        set_unit_price(line, 1000.0, &ctx.catalog).unwrap();
        document.sync_manual_prices();

        let repriced = reprice(&mut document, &ctx);
        assert!(document.manual_prices.is_empty());
        assert_eq!(repriced.pricing.works_price, 1500.0);
    }

    #[test]
    fn validate_document_rejects_negative_values() {
        let mut document = EstimateDocument::empty(EstimateType::Rooms);
        document.rooms.push(Room {
            id: "r1".to_string(),
            name: "Кухня".to_string(),
            works_blocks: vec![block("b1", "Вентиляция", vec![item("i1", -1.0, 1.0)])],
            materials_block: WorkBlock::materials(),
            room_parameters: vec![],
            manually_edited_quantities: Default::default(),
        });

        assert_eq!(
            validate_document(&document),
            Err(PricingError::InvalidAmount {
                field: "unit_price",
                value: -1.0
            })
        );

        document.rooms[0].works_blocks[0].items[0].unit_price = 1.0;
        document.rooms[0].room_parameters.push(RoomParameterValue {
            parameter_id: Uuid::new_v4(),
            value: -3.0,
        });
        assert!(validate_document(&document).is_err());
    }

    #[test]
    fn rooms_estimate_rejects_top_level_blocks() {
        let mut document = EstimateDocument::empty(EstimateType::Rooms);
        assert!(validate_document(&document).is_ok());

        document.works_blocks = vec![block("b1", "Вентиляция", vec![item("i1", 500.0, 1.0)])];
        assert_eq!(
            validate_document(&document),
            Err(PricingError::TopLevelBlocksInRoomsEstimate)
        );

        document.works_blocks.clear();
        document.materials_block.items = vec![manual_item("m1", 40.0, 2.0)];
        assert_eq!(
            validate_document(&document),
            Err(PricingError::TopLevelBlocksInRoomsEstimate)
        );

        let mut apartment = document.clone();
        apartment.estimate_type = EstimateType::Apartment;
        assert!(validate_document(&apartment).is_ok());
    }

    #[test]
    fn catalog_item_added_to_category_block() {
        let floor = work("Стяжка пола", "Черновые работы (Пол)", 500.0, None);
        let ctx = context(vec![floor.clone()], vec![]);
        let mut document = EstimateDocument::empty(EstimateType::Apartment);

        let scope = scope_mut(&mut document, None).unwrap();
        insert_from_catalog(scope.works_blocks, &floor, scope.room_parameters, None).unwrap();

        let repriced = reprice(&mut document, &ctx);
        assert_eq!(document.works_blocks[0].title, "Черновые работы (Пол)");
        assert_eq!(repriced.pricing.works_price, 500.0);
        assert!(repriced.missing.is_empty());
    }
}
