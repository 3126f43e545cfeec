//! Block and summary aggregation
//!
//! Block totals are sums of per-item rounded totals. Rooms estimates also get
//! a read-only summary that merges every room's blocks by title.

use serde::Serialize;

use crate::domain::{EstimateDocument, EstimateTotals, EstimateType, Room, WorkBlock};

use super::adjustment::{adjusted_total, adjusted_unit_price};
use super::CoefficientResolver;

/// Fixed presentation order of summary blocks: demolition, rough and finish
/// stages for each room surface, then ventilation, then everything else.
pub const CATEGORY_ORDER: &[&str] = &[
    "Демонтажные работы (Пол)",
    "Демонтажные работы (Стены)",
    "Демонтажные работы (Потолок)",
    "Черновые работы (Пол)",
    "Черновые работы (Стены)",
    "Черновые работы (Потолок)",
    "Чистовые работы (Пол)",
    "Чистовые работы (Стены)",
    "Чистовые работы (Потолок)",
    "Вентиляция",
    "Прочие работы",
];

/// Position of a block title in [`CATEGORY_ORDER`]; unknown titles rank last
pub fn category_rank(title: &str) -> usize {
    CATEGORY_ORDER
        .iter()
        .position(|t| *t == title)
        .unwrap_or(CATEGORY_ORDER.len())
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Works,
    Materials,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PricedItem {
    pub id: String,
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub adjusted_unit_price: f64,
    pub total_price: f64,
    pub manual_price: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PricedBlock {
    pub id: String,
    pub title: String,
    pub kind: BlockKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub items: Vec<PricedItem>,
    pub total_price: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct EstimatePricing {
    pub blocks: Vec<PricedBlock>,
    pub works_price: f64,
    pub materials_price: f64,
    pub grand_total: f64,
}

impl EstimatePricing {
    pub fn totals(&self) -> EstimateTotals {
        EstimateTotals {
            works_price: self.works_price,
            materials_price: self.materials_price,
            grand_total: self.grand_total,
        }
    }
}

fn price_with(
    block: &WorkBlock,
    resolver: &CoefficientResolver<'_>,
    block_id: Option<&str>,
    kind: BlockKind,
) -> PricedBlock {
    let items: Vec<PricedItem> = block
        .items
        .iter()
        .map(|item| PricedItem {
            id: item.id.clone(),
            name: item.name.clone(),
            unit: item.unit.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            adjusted_unit_price: adjusted_unit_price(item, resolver, block_id),
            total_price: adjusted_total(item, resolver, block_id),
            manual_price: item.is_manual_price(),
        })
        .collect();

    PricedBlock {
        id: block.id.clone(),
        title: block.title.clone(),
        kind,
        room_id: None,
        total_price: items.iter().map(|i| i.total_price).sum(),
        items,
    }
}

/// Price a works block with its own coefficient targeting
pub fn price_block(block: &WorkBlock, resolver: &CoefficientResolver<'_>) -> PricedBlock {
    price_with(block, resolver, Some(block.id.as_str()), BlockKind::Works)
}

/// Price a materials block; only globally targeted coefficients reach materials
pub fn price_materials(block: &WorkBlock, resolver: &CoefficientResolver<'_>) -> PricedBlock {
    price_with(block, resolver, None, BlockKind::Materials)
}

fn price_room(room: &Room, resolver: &CoefficientResolver<'_>) -> Vec<PricedBlock> {
    room.works_blocks
        .iter()
        .map(|b| price_block(b, resolver))
        .chain(std::iter::once(price_materials(&room.materials_block, resolver)))
        .map(|mut priced| {
            priced.room_id = Some(room.id.clone());
            priced
        })
        .collect()
}

/// Price every block of an estimate.
///
/// The grand total is works plus materials; no coefficient is applied at
/// that step.
pub fn price_estimate(
    document: &EstimateDocument,
    resolver: &CoefficientResolver<'_>,
) -> EstimatePricing {
    let blocks: Vec<PricedBlock> = match document.estimate_type {
        EstimateType::Apartment => document
            .works_blocks
            .iter()
            .map(|b| price_block(b, resolver))
            .chain(std::iter::once(price_materials(
                &document.materials_block,
                resolver,
            )))
            .collect(),
        EstimateType::Rooms => document
            .rooms
            .iter()
            .flat_map(|r| price_room(r, resolver))
            .collect(),
    };

    let sum = |kind: BlockKind| -> f64 {
        blocks
            .iter()
            .filter(|b| b.kind == kind)
            .map(|b| b.total_price)
            .sum()
    };
    let works_price = sum(BlockKind::Works);
    let materials_price = sum(BlockKind::Materials);

    EstimatePricing {
        blocks,
        works_price,
        materials_price,
        grand_total: works_price + materials_price,
    }
}

/// Copy priced block totals back onto the document before it is persisted.
/// Item totals stay coefficient-free.
pub fn apply_block_totals(document: &mut EstimateDocument, pricing: &EstimatePricing) {
    let total_of = |room_id: Option<&str>, block_id: &str| {
        pricing
            .blocks
            .iter()
            .find(|p| p.room_id.as_deref() == room_id && p.id == block_id)
            .map(|p| p.total_price)
    };

    match document.estimate_type {
        EstimateType::Apartment => {
            for block in document
                .works_blocks
                .iter_mut()
                .chain(std::iter::once(&mut document.materials_block))
            {
                if let Some(total) = total_of(None, block.id.as_str()) {
                    block.total_price = total;
                }
            }
        }
        EstimateType::Rooms => {
            for room in document.rooms.iter_mut() {
                for block in room
                    .works_blocks
                    .iter_mut()
                    .chain(std::iter::once(&mut room.materials_block))
                {
                    if let Some(total) = total_of(Some(room.id.as_str()), block.id.as_str()) {
                        block.total_price = total;
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryItem {
    pub name: String,
    pub unit: String,
    pub quantity: f64,
    pub total_price: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryBlock {
    pub title: String,
    pub items: Vec<SummaryItem>,
    pub total_price: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct RoomsSummary {
    pub works: Vec<SummaryBlock>,
    pub materials: Vec<SummaryBlock>,
}

/// Merge priced blocks by title and their items by `(name, unit)`.
///
/// Matching items sum quantity and priced total; others are appended in
/// first-seen order. Blocks follow [`CATEGORY_ORDER`], unknown titles after
/// the known ones in alphabetical order.
pub fn merge_blocks<'a>(blocks: impl IntoIterator<Item = &'a PricedBlock>) -> Vec<SummaryBlock> {
    let mut merged: Vec<SummaryBlock> = Vec::new();

    for block in blocks {
        let index = match merged.iter().position(|m| m.title == block.title) {
            Some(i) => i,
            None => {
                merged.push(SummaryBlock {
                    title: block.title.clone(),
                    items: Vec::new(),
                    total_price: 0.0,
                });
                merged.len() - 1
            }
        };
        let target = &mut merged[index];

        for item in &block.items {
            match target
                .items
                .iter_mut()
                .find(|s| s.name == item.name && s.unit == item.unit)
            {
                Some(existing) => {
                    existing.quantity += item.quantity;
                    existing.total_price += item.total_price;
                }
                None => target.items.push(SummaryItem {
                    name: item.name.clone(),
                    unit: item.unit.clone(),
                    quantity: item.quantity,
                    total_price: item.total_price,
                }),
            }
        }
        target.total_price += block.total_price;
    }

    merged.sort_by(|a, b| {
        category_rank(&a.title)
            .cmp(&category_rank(&b.title))
            .then_with(|| a.title.cmp(&b.title))
    });
    merged
}

/// Read-only projection of all rooms, recomputed on every call
pub fn summarize_rooms(rooms: &[Room], resolver: &CoefficientResolver<'_>) -> RoomsSummary {
    let priced: Vec<PricedBlock> = rooms.iter().flat_map(|r| price_room(r, resolver)).collect();

    RoomsSummary {
        works: merge_blocks(priced.iter().filter(|b| b.kind == BlockKind::Works)),
        materials: merge_blocks(priced.iter().filter(|b| b.kind == BlockKind::Materials)),
    }
}
