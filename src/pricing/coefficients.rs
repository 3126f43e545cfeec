//! Coefficient resolution
//!
//! Turns the coefficients selected on an estimate into the two multipliers
//! applied to a block: the normal product and the final product.

use std::collections::{BTreeMap, HashSet};

use crate::domain::{
    Coefficient, CoefficientGroup, CoefficientKind, CoefficientSettings, CoefficientTarget,
};

use super::PricingError;

/// Ids with this prefix belong to a retired id space and never take part in pricing.
pub const RESERVED_PREFIX: &str = "manual_";

pub fn is_reserved(id: &str) -> bool {
    id.starts_with(RESERVED_PREFIX)
}

/// Coefficients that can affect an estimate, with their resolved targets
#[derive(Debug, Clone)]
pub struct CoefficientResolver<'a> {
    applicable: Vec<(&'a Coefficient, CoefficientTarget)>,
}

impl<'a> CoefficientResolver<'a> {
    /// Keeps definitions that are selected, active and not reserved.
    /// A selected coefficient without a settings entry targets the whole estimate.
    pub fn new(
        definitions: &'a [Coefficient],
        selected: &[String],
        settings: &CoefficientSettings,
    ) -> Self {
        let selected: HashSet<&str> = selected.iter().map(String::as_str).collect();

        let applicable = definitions
            .iter()
            .filter(|c| c.is_active && !is_reserved(&c.id) && selected.contains(c.id.as_str()))
            .map(|c| (c, settings.get(&c.id).cloned().unwrap_or_default()))
            .collect();

        Self { applicable }
    }

    /// Resolver with no coefficients; every product is 1.
    #[cfg(test)]
    pub fn identity() -> Self {
        Self {
            applicable: Vec::new(),
        }
    }

    /// Product of normal coefficients reaching `block_id`.
    /// With no block only globally targeted coefficients count.
    pub fn normal_product(&self, block_id: Option<&str>) -> f64 {
        self.product(block_id, CoefficientKind::Normal)
    }

    /// Product of final coefficients reaching `block_id`.
    pub fn final_product(&self, block_id: Option<&str>) -> f64 {
        self.product(block_id, CoefficientKind::Final)
    }

    fn product(&self, block_id: Option<&str>, kind: CoefficientKind) -> f64 {
        self.applicable
            .iter()
            .filter(|(c, target)| c.kind == kind && target.applies_to(block_id))
            .map(|(c, _)| c.value)
            .product()
    }
}

/// Active, non-reserved coefficients grouped by category for selection
pub fn selectable(definitions: &[Coefficient]) -> Vec<CoefficientGroup> {
    let mut groups: BTreeMap<&str, Vec<Coefficient>> = BTreeMap::new();

    for c in definitions
        .iter()
        .filter(|c| c.is_active && !is_reserved(&c.id))
    {
        groups.entry(c.category.as_str()).or_default().push(c.clone());
    }

    groups
        .into_iter()
        .map(|(category, mut coefficients)| {
            coefficients.sort_by(|a, b| a.name.cmp(&b.name));
            CoefficientGroup {
                category: category.to_string(),
                coefficients,
            }
        })
        .collect()
}

/// Input-time check for a coefficient value
pub fn validate_value(value: f64) -> Result<f64, PricingError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PricingError::InvalidCoefficientValue(value))
    }
}
