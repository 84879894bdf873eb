//! Transaction loading using Polars.

use crate::config::DataConfig;
use crate::models::Record;
use anyhow::{bail, Context};
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Load every transaction of a CSV file.
///
/// Fails on a missing column, a null cell, a fractional age, or a price that
/// is not a positive finite number. No partial batch is returned.
pub fn load_records(path: &Path, columns: &DataConfig) -> crate::Result<Vec<Record>> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to open {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to parse CSV {}", path.display()))?;

    debug!("Read {} rows, columns {:?}", df.height(), df.get_column_names());

    let records = records_from_frame(&df, columns)?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Convert a frame with the configured columns into records.
pub fn records_from_frame(df: &DataFrame, columns: &DataConfig) -> crate::Result<Vec<Record>> {
    let countries = string_column(df, &columns.country)?;
    let platforms = string_column(df, &columns.platform)?;
    let sexes = string_column(df, &columns.sex)?;

    let ages = df
        .column(&columns.age)
        .with_context(|| format!("Missing column '{}'", columns.age))?
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", columns.age))?;
    let ages: Vec<Option<f64>> = ages.f64()?.into_iter().collect();

    let prices = df
        .column(&columns.price)
        .with_context(|| format!("Missing column '{}'", columns.price))?
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", columns.price))?;
    let prices: Vec<Option<f64>> = prices.f64()?.into_iter().collect();

    let mut records = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        // Row numbers are 1-based and skip the header line.
        let line = row + 2;
        let (Some(country), Some(platform), Some(sex), Some(age), Some(price)) = (
            countries[row].as_deref(),
            platforms[row].as_deref(),
            sexes[row].as_deref(),
            ages[row],
            prices[row],
        ) else {
            bail!("Row {} has an empty cell", line);
        };
        if [country, platform, sex].iter().any(|v| v.trim().is_empty()) {
            bail!("Row {} has an empty cell", line);
        }

        if !age.is_finite() || age.fract() != 0.0 {
            bail!("Row {} has a non-integer age: {}", line, age);
        }
        let age = age as i64;

        if !price.is_finite() || price <= 0.0 {
            bail!("Row {} has a non-positive price: {}", line, price);
        }

        records.push(Record::new(country.trim(), platform.trim(), sex.trim(), age, price));
    }

    Ok(records)
}

fn string_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    let series = df
        .column(name)
        .with_context(|| format!("Missing column '{}'", name))?
        .cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}
