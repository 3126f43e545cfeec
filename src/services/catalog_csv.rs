//! CSV import/export of the work catalog
//!
//! Columns: `name, category, unit, basePrice`. Import accepts `,` or `;`
//! separated files, a UTF-8 BOM, case-insensitive headers and decimal commas.

use anyhow::{Context, Result};

use crate::domain::{CreateWorkRequest, WorkItem};

pub const HEADERS: [&str; 4] = ["name", "category", "unit", "basePrice"];

/// Rows accepted from a CSV file, plus per-line problems for the rest
#[derive(Debug, Default)]
pub struct ParsedCatalog {
    pub rows: Vec<CreateWorkRequest>,
    pub errors: Vec<String>,
}

pub fn export(works: &[WorkItem]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;

    for work in works {
        writer.write_record([
            work.name.as_str(),
            work.category.as_str(),
            work.unit.as_str(),
            format_price(work.base_price).as_str(),
        ])?;
    }

    let bytes = writer.into_inner().context("Failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("{}", price as i64)
    } else {
        format!("{:.2}", price)
    }
}

fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    cleaned.parse::<f64>().ok()
}

fn detect_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or_default();
    if header.contains(';') && !header.contains(',') {
        b';'
    } else {
        b','
    }
}

pub fn parse(csv_text: &str) -> Result<ParsedCatalog> {
    // Strip UTF-8 BOM if present
    let text = csv_text.trim_start_matches('\u{FEFF}');

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(detect_delimiter(text))
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();

    let column = |name: &str| headers.iter().position(|h| h.trim().eq_ignore_ascii_case(name));
    let columns: Vec<Option<usize>> = HEADERS.iter().map(|&h| column(h)).collect();
    if let Some(missing) = HEADERS
        .iter()
        .zip(&columns)
        .find(|(_, c)| c.is_none())
        .map(|(h, _)| h)
    {
        anyhow::bail!("CSV is missing the \"{}\" column", missing);
    }

    let mut parsed = ParsedCatalog::default();

    for (index, result) in reader.records().enumerate() {
        // header is line 1
        let line = index + 2;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                parsed.errors.push(format!("line {}: {}", line, e));
                continue;
            }
        };

        let field = |i: usize| {
            columns[i]
                .and_then(|c| record.get(c))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };

        let Some(base_price) = parse_price(&field(3)) else {
            parsed
                .errors
                .push(format!("line {}: invalid basePrice \"{}\"", line, field(3)));
            continue;
        };

        let row = CreateWorkRequest {
            name: field(0),
            category: field(1),
            unit: field(2),
            base_price,
            parameter_id: None,
            description: None,
            is_active: true,
        };

        match row.validate() {
            Ok(()) => parsed.rows.push(row),
            Err(problems) => parsed
                .errors
                .push(format!("line {}: {}", line, problems.join("; "))),
        }
    }

    tracing::debug!(
        rows = parsed.rows.len(),
        errors = parsed.errors.len(),
        "Parsed catalog CSV"
    );

    Ok(parsed)
}
