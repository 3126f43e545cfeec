//! Estimate pricing engine
//!
//! Pure functions over an [`EstimateDocument`](crate::domain::EstimateDocument):
//! coefficient resolution, per-item price adjustment, quantity propagation
//! from room parameters, block/summary aggregation and block reordering.
//! Nothing in here touches the database or the network.

pub mod adjustment;
pub mod aggregation;
pub mod blocks;
pub mod coefficients;
pub mod parameters;
pub mod scope;

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::WorkItem;

pub use coefficients::CoefficientResolver;
pub use parameters::QuantityOverridePolicy;

#[derive(Debug, Error, PartialEq)]
pub enum PricingError {
    #[error("Work {work_id} is not in the catalog")]
    MissingCatalogEntry { work_id: Uuid },

    #[error("Coefficient value {0} must be a non-negative number")]
    InvalidCoefficientValue(f64),

    #[error("{field} must be a non-negative number, got {value}")]
    InvalidAmount { field: &'static str, value: f64 },

    #[error("Room {0} not found")]
    UnknownRoom(String),

    #[error("Block {0} not found")]
    UnknownBlock(String),

    #[error("Item {0} not found")]
    UnknownItem(String),

    #[error("Summary is read-only, edit the originating room instead")]
    SummaryIsReadOnly,

    #[error("Rooms estimates keep their blocks inside rooms")]
    TopLevelBlocksInRoomsEstimate,
}

/// A line item whose `work_id` no longer resolves in the catalog.
///
/// Not fatal: the item keeps its stored name, unit and price.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MissingCatalogEntry {
    pub item_id: String,
    pub work_id: Uuid,
}

/// Catalog works indexed by id
#[derive(Debug, Clone, Default)]
pub struct WorkCatalog {
    works: HashMap<Uuid, WorkItem>,
}

impl WorkCatalog {
    pub fn new(works: impl IntoIterator<Item = WorkItem>) -> Self {
        Self {
            works: works.into_iter().map(|w| (w.id, w)).collect(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<&WorkItem> {
        self.works.get(id)
    }

    pub fn require(&self, id: &Uuid) -> Result<&WorkItem, PricingError> {
        self.get(id)
            .ok_or(PricingError::MissingCatalogEntry { work_id: *id })
    }

    /// Parameter a catalog work is linked to, if any
    pub fn parameter_of(&self, work_id: Option<Uuid>) -> Option<Uuid> {
        work_id
            .and_then(|id| self.works.get(&id))
            .and_then(|w| w.parameter_id)
    }
}

/// Rejects negative, NaN and infinite amounts
pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<f64, PricingError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PricingError::InvalidAmount { field, value })
    }
}
