//! Block reordering and catalog grouping

use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::{RoomParameterValue, WorkBlock, WorkItem, WorkLineItem};

use super::parameters::new_line_item;
use super::PricingError;

/// Rewrite `order` so it matches vector position, starting at 0
pub fn renumber(blocks: &mut [WorkBlock]) {
    for (position, block) in blocks.iter_mut().enumerate() {
        block.order = position as i32;
    }
}

/// Move a block to `position`; positions past the end move it last.
pub fn move_block(
    blocks: &mut Vec<WorkBlock>,
    block_id: &str,
    position: usize,
) -> Result<(), PricingError> {
    let from = blocks
        .iter()
        .position(|b| b.id == block_id)
        .ok_or_else(|| PricingError::UnknownBlock(block_id.to_string()))?;

    let block = blocks.remove(from);
    let to = position.min(blocks.len());
    blocks.insert(to, block);
    renumber(blocks);
    Ok(())
}

/// Add a catalog work as a new line item.
///
/// Goes into `block_id` when given, otherwise into the block titled after the
/// work's category, which is created at the end when missing. Returns the
/// new item.
pub fn insert_from_catalog<'a>(
    blocks: &'a mut Vec<WorkBlock>,
    work: &WorkItem,
    values: &[RoomParameterValue],
    block_id: Option<&str>,
) -> Result<&'a WorkLineItem, PricingError> {
    let index = match block_id {
        Some(id) => blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| PricingError::UnknownBlock(id.to_string()))?,
        None => match blocks.iter().position(|b| b.title == work.category) {
            Some(i) => i,
            None => {
                let position = blocks.len();
                blocks.push(WorkBlock {
                    id: Uuid::new_v4().to_string(),
                    title: work.category.clone(),
                    order: position as i32,
                    ..Default::default()
                });
                position
            }
        },
    };

    let items = &mut blocks[index].items;
    items.push(new_line_item(work, values));
    Ok(&items[items.len() - 1])
}

/// Titles used by more than one block, in first-seen order
pub fn duplicate_titles(blocks: &[WorkBlock]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for block in blocks {
        *counts.entry(block.title.as_str()).or_default() += 1;
    }

    let mut duplicates: Vec<String> = Vec::new();
    for block in blocks {
        if counts[block.title.as_str()] > 1 && !duplicates.contains(&block.title) {
            duplicates.push(block.title.clone());
        }
    }
    duplicates
}

pub fn find_item_mut<'a>(
    blocks: impl IntoIterator<Item = &'a mut WorkBlock>,
    item_id: &str,
) -> Option<&'a mut WorkLineItem> {
    blocks
        .into_iter()
        .flat_map(|b| b.items.iter_mut())
        .find(|i| i.id == item_id)
}
