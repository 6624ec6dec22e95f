//! Dataset CSV loading.
//!
//! The first column holds the year; every other column is one annual series
//! named by its header. Empty cells are missing values.

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context, Result};

use flowcast_core::{AnnualSeries, Dataset};

/// Loads a dataset from a CSV file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a row cannot be parsed.
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open dataset CSV: {}", path.display()))?;
    let dataset =
        read_dataset(file).with_context(|| format!("Invalid dataset CSV: {}", path.display()))?;
    tracing::info!(
        series = dataset.len(),
        path = %path.display(),
        "Loaded dataset"
    );
    Ok(dataset)
}

/// Parses dataset CSV from any reader.
///
/// # Errors
///
/// Returns an error for a missing `year` column, a non-integer year or a
/// non-numeric value.
pub fn read_dataset(reader: impl Read) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = reader.headers().context("Failed to read CSV header")?.clone();

    match headers.get(0) {
        Some(first) if first.eq_ignore_ascii_case("year") => {}
        _ => bail!("first column must be 'year'"),
    }
    let mut columns: Vec<AnnualSeries> = headers.iter().skip(1).map(AnnualSeries::new).collect();

    for (line, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV row {}", line + 2))?;
        let year_field = record.get(0).unwrap_or_default();
        let year: i32 = year_field
            .parse()
            .with_context(|| format!("row {}: invalid year '{year_field}'", line + 2))?;

        for (series, field) in columns.iter_mut().zip(record.iter().skip(1)) {
            if field.is_empty() {
                continue;
            }
            let value: f64 = field.parse().with_context(|| {
                format!("row {}: invalid value '{field}' for '{}'", line + 2, series.name)
            })?;
            if value.is_finite() {
                series.insert(year, value);
            }
        }
    }

    Ok(columns.into_iter().collect())
}
