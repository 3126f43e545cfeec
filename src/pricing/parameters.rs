//! Quantity-from-parameter propagation
//!
//! Catalog works may be linked to a room parameter. Setting that parameter
//! writes its value into the quantity of every linked line item.

use serde::Deserialize;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::{PriceSource, RoomParameterValue, WorkBlock, WorkItem, WorkLineItem};

use super::{non_negative, PricingError, WorkCatalog};

/// What happens to a hand-edited quantity when its parameter changes again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityOverridePolicy {
    /// The new parameter value overwrites the quantity and clears the manual flag
    #[default]
    ParameterWins,
    /// Hand-edited quantities are left alone until the flag is cleared
    Sticky,
}

impl QuantityOverridePolicy {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sticky" => Self::Sticky,
            _ => Self::ParameterWins,
        }
    }
}

pub fn parameter_value(values: &[RoomParameterValue], parameter_id: Uuid) -> Option<f64> {
    values
        .iter()
        .find(|v| v.parameter_id == parameter_id)
        .map(|v| v.value)
}

/// Insert or overwrite a parameter value
pub fn set_parameter_value(
    values: &mut Vec<RoomParameterValue>,
    parameter_id: Uuid,
    value: f64,
) -> Result<(), PricingError> {
    let value = non_negative("value", value)?;
    match values.iter_mut().find(|v| v.parameter_id == parameter_id) {
        Some(existing) => existing.value = value,
        None => values.push(RoomParameterValue {
            parameter_id,
            value,
        }),
    }
    Ok(())
}

/// Push a parameter value into every linked item of `blocks`.
///
/// Totals are recomputed as `quantity × unit_price`; coefficients are never
/// baked in. Returns how many items were updated.
pub fn propagate<'a>(
    blocks: impl IntoIterator<Item = &'a mut WorkBlock>,
    catalog: &WorkCatalog,
    parameter_id: Uuid,
    value: f64,
    manual_quantities: &mut BTreeSet<String>,
    policy: QuantityOverridePolicy,
) -> usize {
    let mut updated = 0;

    for block in blocks {
        for item in block
            .items
            .iter_mut()
            .filter(|i| catalog.parameter_of(i.work_id) == Some(parameter_id))
        {
            if policy == QuantityOverridePolicy::Sticky && manual_quantities.contains(&item.id) {
                continue;
            }

            item.quantity = value;
            item.recompute_total();
            manual_quantities.remove(&item.id);
            updated += 1;
        }
    }

    tracing::debug!(parameter_id = %parameter_id, value, updated, "Propagated room parameter");
    updated
}

/// Edit a quantity by hand.
///
/// The item is flagged as manually edited when it is linked to a parameter
/// that has a value and the new quantity differs from it.
pub fn set_quantity(
    item: &mut WorkLineItem,
    quantity: f64,
    catalog: &WorkCatalog,
    values: &[RoomParameterValue],
    manual_quantities: &mut BTreeSet<String>,
) -> Result<(), PricingError> {
    let quantity = non_negative("quantity", quantity)?;

    let diverges = catalog
        .parameter_of(item.work_id)
        .and_then(|p| parameter_value(values, p))
        .is_some_and(|v| v != quantity);

    if diverges {
        manual_quantities.insert(item.id.clone());
    } else {
        manual_quantities.remove(&item.id);
    }

    item.quantity = quantity;
    item.recompute_total();
    Ok(())
}

/// New line item for a catalog work.
///
/// Starts at the linked parameter's value when one above zero is set, else at 1.
pub fn new_line_item(work: &WorkItem, values: &[RoomParameterValue]) -> WorkLineItem {
    let quantity = work
        .parameter_id
        .and_then(|p| parameter_value(values, p))
        .filter(|v| *v > 0.0)
        .unwrap_or(1.0);

    let mut item = WorkLineItem {
        id: Uuid::new_v4().to_string(),
        work_id: Some(work.id),
        name: work.name.clone(),
        unit: work.unit.clone(),
        quantity,
        unit_price: work.base_price,
        total_price: 0.0,
        price_source: Some(PriceSource::Catalog {
            base_price: work.base_price,
        }),
    };
    item.recompute_total();
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::fixtures::{block, item, work};

    struct Setup {
        area: Uuid,
        catalog: WorkCatalog,
        blocks: Vec<WorkBlock>,
    }

    fn setup() -> Setup {
        let area = Uuid::new_v4();
        let screed = work("Стяжка пола", "Черновые работы (Пол)", 450.0, Some(area));
        let door = work("Установка двери", "Прочие работы", 3000.0, None);

        let mut linked = item("linked", 450.0, 1.0);
        linked.work_id = Some(screed.id);
        let mut linked_other_block = item("linked2", 200.0, 4.0);
        linked_other_block.work_id = Some(screed.id);
        let mut unlinked = item("unlinked", 3000.0, 2.0);
        unlinked.work_id = Some(door.id);

        Setup {
            area,
            catalog: WorkCatalog::new(vec![screed, door]),
            blocks: vec![
                block("b1", "Черновые работы (Пол)", vec![linked, unlinked]),
                block("b2", "Чистовые работы (Пол)", vec![linked_other_block]),
            ],
        }
    }

    #[test]
    fn propagation_updates_linked_items_only() {
        let mut s = setup();
        let mut manual = BTreeSet::new();

        let updated = propagate(
            s.blocks.iter_mut(),
            &s.catalog,
            s.area,
            18.5,
            &mut manual,
            QuantityOverridePolicy::ParameterWins,
        );

        assert_eq!(updated, 2);
        assert_eq!(s.blocks[0].items[0].quantity, 18.5);
        assert_eq!(s.blocks[0].items[0].total_price, 18.5 * 450.0);
        assert_eq!(s.blocks[0].items[1].quantity, 2.0);
        assert_eq!(s.blocks[1].items[0].total_price, 18.5 * 200.0);
    }

    #[test]
    fn parameter_wins_clears_manual_flag() {
        let mut s = setup();
        let values = vec![RoomParameterValue {
            parameter_id: s.area,
            value: 20.0,
        }];
        let mut manual = BTreeSet::new();

        set_quantity(&mut s.blocks[0].items[0], 12.0, &s.catalog, &values, &mut manual).unwrap();
        assert!(manual.contains("linked"));

        propagate(
            s.blocks.iter_mut(),
            &s.catalog,
            s.area,
            22.0,
            &mut manual,
            QuantityOverridePolicy::ParameterWins,
        );
        assert_eq!(s.blocks[0].items[0].quantity, 22.0);
        assert!(manual.is_empty());
    }

    #[test]
    fn sticky_policy_keeps_manual_quantity() {
        let mut s = setup();
        let values = vec![RoomParameterValue {
            parameter_id: s.area,
            value: 20.0,
        }];
        let mut manual = BTreeSet::new();
        set_quantity(&mut s.blocks[0].items[0], 12.0, &s.catalog, &values, &mut manual).unwrap();

        let updated = propagate(
            s.blocks.iter_mut(),
            &s.catalog,
            s.area,
            22.0,
            &mut manual,
            QuantityOverridePolicy::Sticky,
        );
        assert_eq!(updated, 1);
        assert_eq!(s.blocks[0].items[0].quantity, 12.0);
        assert!(manual.contains("linked"));
    }

    #[test]
    fn quantity_matching_parameter_is_not_manual() {
        let mut s = setup();
        let values = vec![RoomParameterValue {
            parameter_id: s.area,
            value: 20.0,
        }];
        let mut manual = BTreeSet::from(["linked".to_string()]);

        set_quantity(&mut s.blocks[0].items[0], 20.0, &s.catalog, &values, &mut manual).unwrap();
        assert!(manual.is_empty());

        // unlinked items never get the flag
        set_quantity(&mut s.blocks[0].items[1], 5.0, &s.catalog, &values, &mut manual).unwrap();
        assert!(manual.is_empty());
        assert_eq!(s.blocks[0].items[1].total_price, 15000.0);
    }

    #[test]
    fn new_item_adopts_parameter_value() {
        let area = Uuid::new_v4();
        let screed = work("Стяжка пола", "Черновые работы (Пол)", 450.0, Some(area));

        let fresh = new_line_item(&screed, &[]);
        assert_eq!(fresh.quantity, 1.0);
        assert_eq!(fresh.total_price, 450.0);

        let zero = [RoomParameterValue {
            parameter_id: area,
            value: 0.0,
        }];
        assert_eq!(new_line_item(&screed, &zero).quantity, 1.0);

        let set = [RoomParameterValue {
            parameter_id: area,
            value: 14.2,
        }];
        let linked = new_line_item(&screed, &set);
        assert_eq!(linked.quantity, 14.2);
        assert_eq!(
            linked.price_source,
            Some(PriceSource::Catalog { base_price: 450.0 })
        );
    }

    #[test]
    fn set_parameter_value_upserts() {
        let p = Uuid::new_v4();
        let mut values = Vec::new();
        set_parameter_value(&mut values, p, 10.0).unwrap();
        set_parameter_value(&mut values, p, 12.5).unwrap();
        assert_eq!(values.len(), 1);
        assert_eq!(parameter_value(&values, p), Some(12.5));
        assert!(set_parameter_value(&mut values, p, -1.0).is_err());
    }

    #[test]
    fn policy_parses_from_config() {
        assert_eq!(
            QuantityOverridePolicy::parse("Sticky"),
            QuantityOverridePolicy::Sticky
        );
        assert_eq!(
            QuantityOverridePolicy::parse("parameter_wins"),
            QuantityOverridePolicy::ParameterWins
        );
    }
}
