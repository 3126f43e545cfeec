//! Edit routing
//!
//! Apartment estimates are edited as a whole; rooms estimates only through a
//! specific room. The rooms summary is a projection and never takes edits.

use std::collections::BTreeSet;

use crate::domain::{EstimateDocument, EstimateType, RoomParameterValue, WorkBlock};

use super::PricingError;

/// Which part of an estimate an edit is aimed at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditScope {
    Estimate,
    Room(String),
    Summary,
}

impl EditScope {
    pub fn resolve(estimate_type: EstimateType, room_id: Option<&str>) -> Self {
        match (estimate_type, room_id) {
            (EstimateType::Apartment, None) => Self::Estimate,
            (_, Some(id)) => Self::Room(id.to_string()),
            (EstimateType::Rooms, None) => Self::Summary,
        }
    }
}

/// Mutable view over the blocks and parameter state an edit may touch
pub struct ScopeMut<'a> {
    pub works_blocks: &'a mut Vec<WorkBlock>,
    pub materials_block: &'a mut WorkBlock,
    pub room_parameters: &'a mut Vec<RoomParameterValue>,
    pub manually_edited_quantities: &'a mut BTreeSet<String>,
}

/// Borrow the part of `document` addressed by `room_id`
pub fn scope_mut<'a>(
    document: &'a mut EstimateDocument,
    room_id: Option<&str>,
) -> Result<ScopeMut<'a>, PricingError> {
    match EditScope::resolve(document.estimate_type, room_id) {
        EditScope::Summary => Err(PricingError::SummaryIsReadOnly),
        EditScope::Estimate => Ok(ScopeMut {
            works_blocks: &mut document.works_blocks,
            materials_block: &mut document.materials_block,
            room_parameters: &mut document.room_parameters,
            manually_edited_quantities: &mut document.manually_edited_quantities,
        }),
        EditScope::Room(id) => {
            let room = document
                .rooms
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(PricingError::UnknownRoom(id))?;
            Ok(ScopeMut {
                works_blocks: &mut room.works_blocks,
                materials_block: &mut room.materials_block,
                room_parameters: &mut room.room_parameters,
                manually_edited_quantities: &mut room.manually_edited_quantities,
            })
        }
    }
}
