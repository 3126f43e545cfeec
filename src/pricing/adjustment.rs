//! Per-item price adjustment
//!
//! Manual prices only take final coefficients; catalog prices take normal
//! coefficients first and final ones after. Rounding happens once, on the
//! line total.

use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::{EstimateDocument, PriceSource, WorkLineItem};

use super::{non_negative, CoefficientResolver, MissingCatalogEntry, PricingError, WorkCatalog};

/// Unit price after coefficients, unrounded
pub fn adjusted_unit_price(
    item: &WorkLineItem,
    resolver: &CoefficientResolver<'_>,
    block_id: Option<&str>,
) -> f64 {
    if item.is_manual_price() {
        item.unit_price * resolver.final_product(block_id)
    } else {
        item.unit_price * resolver.normal_product(block_id) * resolver.final_product(block_id)
    }
}

/// Line total after coefficients, rounded to whole currency units
pub fn adjusted_total(
    item: &WorkLineItem,
    resolver: &CoefficientResolver<'_>,
    block_id: Option<&str>,
) -> f64 {
    (adjusted_unit_price(item, resolver, block_id) * item.quantity).round()
}

/// Decide whether a price is catalog-derived or hand-set.
///
/// Free-text lines with a positive price are always manual. Catalog-linked
/// lines are manual as soon as they diverge from the catalog base price. A
/// work id the catalog no longer knows is reported and keeps its stored price
/// as an automatic one.
pub fn classify_price(
    work_id: Option<Uuid>,
    unit_price: f64,
    catalog: &WorkCatalog,
) -> (PriceSource, Option<Uuid>) {
    match work_id {
        None if unit_price > 0.0 => (PriceSource::Manual, None),
        None => (
            PriceSource::Catalog {
                base_price: unit_price,
            },
            None,
        ),
        Some(id) => match catalog.get(&id) {
            Some(work) if work.base_price == unit_price => (
                PriceSource::Catalog {
                    base_price: work.base_price,
                },
                None,
            ),
            Some(_) => (PriceSource::Manual, None),
            None => (
                PriceSource::Catalog {
                    base_price: unit_price,
                },
                Some(id),
            ),
        },
    }
}

/// Edit a unit price, re-deriving the price source.
///
/// Editing a catalog line back to exactly its base price makes it automatic again.
pub fn set_unit_price(
    item: &mut WorkLineItem,
    unit_price: f64,
    catalog: &WorkCatalog,
) -> Result<(), PricingError> {
    let unit_price = non_negative("unit_price", unit_price)?;
    let (source, missing) = classify_price(item.work_id, unit_price, catalog);

    if let Some(work_id) = missing {
        tracing::warn!(item_id = %item.id, work_id = %work_id, "Edited item references a missing catalog entry");
    }

    item.unit_price = unit_price;
    item.price_source = Some(source);
    item.recompute_total();
    Ok(())
}

/// Re-derive the price source of every item of the document.
///
/// Incoming tags are not trusted: an item is manual when it is listed in
/// `manual_prices`, tagged manual, or classified manual against the catalog;
/// otherwise it is catalog-priced at the current base price. `manual_prices`
/// is rebuilt from the tags afterwards. Returns the items whose catalog entry
/// is gone.
pub fn resolve_price_sources(
    document: &mut EstimateDocument,
    catalog: &WorkCatalog,
) -> Vec<MissingCatalogEntry> {
    let listed_manual: HashSet<String> = std::mem::take(&mut document.manual_prices)
        .into_iter()
        .collect();
    let mut missing = Vec::new();

    for block in document.all_blocks_mut() {
        for item in block.items.iter_mut() {
            if let Some(work_id) = item.work_id {
                if catalog.get(&work_id).is_none() {
                    missing.push(MissingCatalogEntry {
                        item_id: item.id.clone(),
                        work_id,
                    });
                }
            }

            let (derived, _) = classify_price(item.work_id, item.unit_price, catalog);
            let manual = listed_manual.contains(&item.id)
                || item.is_manual_price()
                || derived == PriceSource::Manual;

            item.price_source = Some(if manual { PriceSource::Manual } else { derived });
        }
    }

    document.sync_manual_prices();

    if !missing.is_empty() {
        tracing::warn!(count = missing.len(), "Estimate references works missing from the catalog");
    }

    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CoefficientKind, CoefficientSettings, EstimateType};
    use crate::pricing::fixtures::{block, coefficient, item, manual_item, work};

    fn premium() -> Vec<crate::domain::Coefficient> {
        vec![
            coefficient("premium", 1.2, CoefficientKind::Final),
            coefficient("complexity", 1.5, CoefficientKind::Normal),
        ]
    }

    #[test]
    fn catalog_item_takes_final_coefficient() {
        let defs = premium();
        let resolver =
            CoefficientResolver::new(&defs, &["premium".into()], &CoefficientSettings::new());
        let line = item("i1", 1000.0, 2.0);

        assert_eq!(adjusted_unit_price(&line, &resolver, Some("b1")), 1200.0);
        assert_eq!(adjusted_total(&line, &resolver, Some("b1")), 2400.0);
    }

    #[test]
    fn manual_item_skips_normal_coefficients() {
        let defs = premium();
        let resolver = CoefficientResolver::new(
            &defs,
            &["premium".into(), "complexity".into()],
            &CoefficientSettings::new(),
        );
        let line = manual_item("i1", 1100.0, 2.0);

        assert_eq!(adjusted_unit_price(&line, &resolver, Some("b1")), 1320.0);
        assert_eq!(adjusted_total(&line, &resolver, Some("b1")), 2640.0);
    }

    #[test]
    fn catalog_item_applies_normal_then_final() {
        let defs = premium();
        let resolver = CoefficientResolver::new(
            &defs,
            &["premium".into(), "complexity".into()],
            &CoefficientSettings::new(),
        );
        let line = item("i1", 100.0, 3.0);

        // 100 × 1.5 × 1.2 = 180, × 3 = 540
        assert!((adjusted_unit_price(&line, &resolver, None) - 180.0).abs() < 1e-9);
        assert_eq!(adjusted_total(&line, &resolver, None), 540.0);
    }

    #[test]
    fn rounding_happens_on_the_total() {
        let defs = vec![coefficient("k", 1.15, CoefficientKind::Normal)];
        let resolver = CoefficientResolver::new(&defs, &["k".into()], &CoefficientSettings::new());
        let line = item("i1", 33.0, 3.0);

        // 33 × 1.15 = 37.95 per unit, 113.85 total
        let unit = adjusted_unit_price(&line, &resolver, None);
        assert!((unit - 37.95).abs() < 1e-9);
        assert_eq!(adjusted_total(&line, &resolver, None), 114.0);

        let line = item("i2", 10.3, 7.0);
        let plain = CoefficientResolver::identity();
        // 72.1 → 72, while round(10.3) × 7 would be 70
        assert_eq!(adjusted_total(&line, &plain, None), 72.0);
    }

    #[test]
    fn free_text_positive_price_is_manual() {
        let catalog = WorkCatalog::default();
        assert_eq!(classify_price(None, 500.0, &catalog).0, PriceSource::Manual);
        assert_eq!(
            classify_price(None, 0.0, &catalog).0,
            PriceSource::Catalog { base_price: 0.0 }
        );
    }

    #[test]
    fn editing_away_and_back_toggles_manual() {
        let screed = work("Стяжка пола", "Черновые работы (Пол)", 450.0, None);
        let mut line = item("i1", 450.0, 10.0);
        line.work_id = Some(screed.id);
        let catalog = WorkCatalog::new(vec![screed]);

        set_unit_price(&mut line, 500.0, &catalog).unwrap();
        assert!(line.is_manual_price());
        assert_eq!(line.total_price, 5000.0);

        set_unit_price(&mut line, 450.0, &catalog).unwrap();
        assert_eq!(
            line.price_source,
            Some(PriceSource::Catalog { base_price: 450.0 })
        );
        assert_eq!(line.total_price, 4500.0);
    }

    #[test]
    fn negative_price_is_rejected() {
        let mut line = item("i1", 10.0, 1.0);
        let err = set_unit_price(&mut line, -5.0, &WorkCatalog::default()).unwrap_err();
        assert_eq!(
            err,
            PricingError::InvalidAmount {
                field: "unit_price",
                value: -5.0
            }
        );
        assert_eq!(line.unit_price, 10.0);
    }

    #[test]
    fn resolve_folds_legacy_list_and_reports_missing() {
        let plaster = work("Штукатурка", "Черновые работы (Стены)", 600.0, None);
        let mut on_catalog = item("on_catalog", 600.0, 1.0);
        on_catalog.work_id = Some(plaster.id);
        on_catalog.price_source = None;
        let mut diverged = item("diverged", 650.0, 1.0);
        diverged.work_id = Some(plaster.id);
        diverged.price_source = None;
        let mut legacy = item("legacy", 600.0, 1.0);
        legacy.work_id = Some(plaster.id);
        legacy.price_source = None;
        let mut orphan = item("orphan", 80.0, 1.0);
        orphan.work_id = Some(Uuid::new_v4());
        orphan.price_source = None;

        let mut doc = EstimateDocument::empty(EstimateType::Apartment);
        doc.works_blocks.push(block(
            "b1",
            "Черновые работы (Стены)",
            vec![on_catalog, diverged, legacy, orphan.clone()],
        ));
        doc.manual_prices = vec!["legacy".into()];

        let catalog = WorkCatalog::new(vec![plaster]);
        let missing = resolve_price_sources(&mut doc, &catalog);

        let sources: Vec<_> = doc.works_blocks[0]
            .items
            .iter()
            .map(|i| i.price_source)
            .collect();
        assert_eq!(
            sources,
            vec![
                Some(PriceSource::Catalog { base_price: 600.0 }),
                Some(PriceSource::Manual),
                Some(PriceSource::Manual),
                Some(PriceSource::Catalog { base_price: 80.0 }),
            ]
        );
        assert_eq!(doc.manual_prices, vec!["diverged".to_string(), "legacy".to_string()]);
        assert_eq!(
            missing,
            vec![MissingCatalogEntry {
                item_id: "orphan".into(),
                work_id: orphan.work_id.unwrap(),
            }]
        );
    }

    #[test]
    fn resolve_reclassifies_stale_catalog_tags() {
        let tiling = work("Укладка плитки", "Чистовые работы (Пол)", 1000.0, None);
        let mut diverged = item("i1", 1100.0, 2.0);
        diverged.work_id = Some(tiling.id);
        diverged.price_source = Some(PriceSource::Catalog { base_price: 1000.0 });
        let mut unlisted = item("i2", 1100.0, 1.0);
        unlisted.work_id = Some(tiling.id);
        unlisted.price_source = Some(PriceSource::Catalog { base_price: 1000.0 });
        let free_text = item("free", 500.0, 1.0);
        let mut stale_base = item("i3", 1000.0, 1.0);
        stale_base.work_id = Some(tiling.id);
        stale_base.price_source = Some(PriceSource::Catalog { base_price: 900.0 });

        let mut doc = EstimateDocument::empty(EstimateType::Apartment);
        doc.works_blocks.push(block(
            "b1",
            "Чистовые работы (Пол)",
            vec![diverged, unlisted, free_text, stale_base],
        ));
        doc.manual_prices = vec!["i1".into()];
        doc.coefficients = vec!["premium".into(), "complexity".into()];

        let catalog = WorkCatalog::new(vec![tiling]);
        resolve_price_sources(&mut doc, &catalog);

        let items = &doc.works_blocks[0].items;
        assert_eq!(items[0].price_source, Some(PriceSource::Manual));
        assert_eq!(items[1].price_source, Some(PriceSource::Manual));
        assert_eq!(items[2].price_source, Some(PriceSource::Manual));
        assert_eq!(
            items[3].price_source,
            Some(PriceSource::Catalog { base_price: 1000.0 })
        );
        assert_eq!(
            doc.manual_prices,
            vec!["i1".to_string(), "i2".to_string(), "free".to_string()]
        );

        let defs = premium();
        let resolver =
            CoefficientResolver::new(&defs, &doc.coefficients, &doc.coefficient_settings);
        // 1100 × 1.2 × 2 and 500 × 1.2: only the final coefficient applies
        assert_eq!(adjusted_total(&items[0], &resolver, Some("b1")), 2640.0);
        assert_eq!(adjusted_total(&items[2], &resolver, Some("b1")), 600.0);
        // 1000 × 1.5 × 1.2
        assert_eq!(adjusted_total(&items[3], &resolver, Some("b1")), 1800.0);
    }

    #[test]
    fn resolve_keeps_manual_tags() {
        let mut doc = EstimateDocument::empty(EstimateType::Apartment);
        doc.works_blocks
            .push(block("b1", "Прочее", vec![manual_item("m", 100.0, 1.0)]));
        resolve_price_sources(&mut doc, &WorkCatalog::default());
        assert!(doc.works_blocks[0].items[0].is_manual_price());
        assert_eq!(doc.manual_prices, vec!["m".to_string()]);
    }
}
