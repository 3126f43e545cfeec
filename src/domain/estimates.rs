//! Estimate domain types
//!
//! An estimate is persisted as one JSON document (blocks, rooms, selected
//! coefficients, parameter values) alongside denormalised totals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use super::coefficients::CoefficientSettings;
use super::room_parameters::RoomParameterValue;
use crate::pricing::aggregation::{EstimatePricing, SummaryBlock};
use crate::pricing::MissingCatalogEntry;

/// Estimate layout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EstimateType {
    /// One set of work blocks for the whole apartment
    #[default]
    Apartment,
    /// Work blocks per room, plus a derived summary
    Rooms,
}

impl EstimateType {
    pub fn parse(s: &str) -> Self {
        match s {
            "rooms" => Self::Rooms,
            _ => Self::Apartment,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Apartment => "apartment",
            Self::Rooms => "rooms",
        }
    }
}

/// Where a line item's unit price came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceSource {
    /// Price taken from the catalog; both coefficient passes apply
    Catalog { base_price: f64 },
    /// Hand-set price; only final coefficients apply
    Manual,
}

/// One line of a work or materials block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkLineItem {
    pub id: String,
    /// `None` for free-text lines authored in the estimate
    #[serde(default)]
    pub work_id: Option<Uuid>,
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_price: f64,
    /// Stored as `quantity × unit_price`, before coefficients
    #[serde(default)]
    pub total_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_source: Option<PriceSource>,
}

impl WorkLineItem {
    pub fn is_manual_price(&self) -> bool {
        matches!(self.price_source, Some(PriceSource::Manual))
    }

    pub fn recompute_total(&mut self) {
        self.total_price = self.quantity * self.unit_price;
    }
}

/// An ordered group of line items, usually one catalog category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WorkBlock {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub is_collapsed: bool,
    #[serde(default)]
    pub items: Vec<WorkLineItem>,
    #[serde(default)]
    pub total_price: f64,
}

impl WorkBlock {
    pub fn materials() -> Self {
        Self {
            id: "materials".to_string(),
            title: "Материалы".to_string(),
            ..Default::default()
        }
    }
}

fn default_materials_block() -> WorkBlock {
    WorkBlock::materials()
}

/// A room of a rooms-type estimate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub works_blocks: Vec<WorkBlock>,
    #[serde(default = "default_materials_block")]
    pub materials_block: WorkBlock,
    #[serde(default)]
    pub room_parameters: Vec<RoomParameterValue>,
    #[serde(default)]
    pub manually_edited_quantities: BTreeSet<String>,
}

/// The editable body of an estimate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimateDocument {
    #[serde(rename = "type", default)]
    pub estimate_type: EstimateType,
    #[serde(default)]
    pub works_blocks: Vec<WorkBlock>,
    #[serde(default = "default_materials_block")]
    pub materials_block: WorkBlock,
    #[serde(default)]
    pub rooms: Vec<Room>,
    /// Selected coefficient ids
    #[serde(default)]
    pub coefficients: Vec<String>,
    #[serde(default)]
    pub coefficient_settings: CoefficientSettings,
    /// Ids of manually priced items; derived from the item tags on output
    #[serde(default)]
    pub manual_prices: Vec<String>,
    #[serde(default)]
    pub room_parameters: Vec<RoomParameterValue>,
    #[serde(default)]
    pub manually_edited_quantities: BTreeSet<String>,
}

impl EstimateDocument {
    pub fn empty(estimate_type: EstimateType) -> Self {
        Self {
            estimate_type,
            works_blocks: Vec::new(),
            materials_block: WorkBlock::materials(),
            rooms: Vec::new(),
            coefficients: Vec::new(),
            coefficient_settings: CoefficientSettings::new(),
            manual_prices: Vec::new(),
            room_parameters: Vec::new(),
            manually_edited_quantities: BTreeSet::new(),
        }
    }

    /// Every block of the document, room blocks included
    pub fn all_blocks(&self) -> impl Iterator<Item = &WorkBlock> {
        self.works_blocks
            .iter()
            .chain(std::iter::once(&self.materials_block))
            .chain(
                self.rooms
                    .iter()
                    .flat_map(|r| r.works_blocks.iter().chain(std::iter::once(&r.materials_block))),
            )
    }

    pub fn all_blocks_mut(&mut self) -> impl Iterator<Item = &mut WorkBlock> {
        self.works_blocks
            .iter_mut()
            .chain(std::iter::once(&mut self.materials_block))
            .chain(self.rooms.iter_mut().flat_map(|r| {
                r.works_blocks
                    .iter_mut()
                    .chain(std::iter::once(&mut r.materials_block))
            }))
    }

    /// Rebuild `manual_prices` from the item tags
    pub fn sync_manual_prices(&mut self) {
        let ids: Vec<String> = self
            .all_blocks()
            .flat_map(|b| b.items.iter())
            .filter(|i| i.is_manual_price())
            .map(|i| i.id.clone())
            .collect();
        self.manual_prices = ids;
    }
}

/// Denormalised totals kept next to the document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct EstimateTotals {
    pub works_price: f64,
    pub materials_price: f64,
    pub grand_total: f64,
}

/// Request DTO for creating an estimate
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEstimateRequest {
    pub name: String,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(rename = "type", default)]
    pub estimate_type: EstimateType,
}

/// Request DTO for the whole-estimate replace
#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceEstimateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub client_id: Option<Uuid>,
    #[serde(flatten)]
    pub document: EstimateDocument,
}

/// Request DTO for setting a room parameter value
#[derive(Debug, Clone, Deserialize)]
pub struct SetParameterRequest {
    #[serde(default)]
    pub room_id: Option<String>,
    pub parameter_id: Uuid,
    pub value: f64,
}

/// Request DTO for adding a catalog work to an estimate
#[derive(Debug, Clone, Deserialize)]
pub struct AddItemRequest {
    #[serde(default)]
    pub room_id: Option<String>,
    pub work_id: Uuid,
    /// Insert into this block instead of the block matching the work's category
    #[serde(default)]
    pub block_id: Option<String>,
}

/// Request DTO for editing a line item in place
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateItemRequest {
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<f64>,
}

/// Request DTO for moving a block
#[derive(Debug, Clone, Deserialize)]
pub struct MoveBlockRequest {
    #[serde(default)]
    pub room_id: Option<String>,
    pub position: usize,
}

/// Listing row
#[derive(Debug, Clone, Serialize)]
pub struct EstimateListItem {
    pub id: Uuid,
    pub name: String,
    pub client_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub estimate_type: EstimateType,
    pub totals: EstimateTotals,
    pub updated_at: DateTime<Utc>,
}

/// Response DTO for an estimate with its recomputed pricing
#[derive(Debug, Clone, Serialize)]
pub struct EstimateResponse {
    pub id: Uuid,
    pub name: String,
    pub client_id: Option<Uuid>,
    #[serde(flatten)]
    pub document: EstimateDocument,
    pub totals: EstimateTotals,
    pub pricing: EstimatePricing,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing_catalog_entries: Vec<MissingCatalogEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response DTO for the rooms summary
#[derive(Debug, Clone, Serialize)]
pub struct SummaryResponse {
    pub estimate_id: Uuid,
    pub works: Vec<SummaryBlock>,
    pub materials: Vec<SummaryBlock>,
    pub totals: EstimateTotals,
}
