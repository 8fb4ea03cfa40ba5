//! Dataset loader and numeric column repair

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;

/// Column known to arrive as text with blank entries in the telco export
pub const TOTAL_CHARGES: &str = "TotalCharges";

/// Default dataset locations, tried in order
pub const DEFAULT_DATA_CANDIDATES: [&str; 2] = [
    "data/WA_Fn-UseC_-Telco-Customer-Churn.csv",
    "data/telco.csv",
];

/// Return the first candidate path that exists on disk
pub fn locate_dataset(candidates: &[PathBuf]) -> Result<PathBuf> {
    candidates
        .iter()
        .find(|p| p.exists())
        .cloned()
        .ok_or_else(|| {
            let tried: Vec<String> = candidates.iter().map(|p| p.display().to_string()).collect();
            anyhow::anyhow!(
                "Dataset not found. Place the CSV at one of: {}",
                tried.join(", ")
            )
        })
}

/// Load a CSV file with a header row into a DataFrame
///
/// # Arguments
/// * `path` - Path to the CSV file
/// * `infer_schema_length` - Rows used for type inference (0 = full scan)
pub fn load_csv(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {}", path.display());
    }

    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(schema_length)
        .finish()
        .with_context(|| format!("Failed to load CSV file: {}", path.display()))?
        .collect()
        .with_context(|| format!("Failed to parse CSV file: {}", path.display()))
}

/// Coerce a column to optional floats.
///
/// Numeric columns are cast directly. Text is trimmed first; empty,
/// whitespace-only and unparseable entries become `None`.
pub fn coerce_numeric(column: &Column) -> Result<Vec<Option<f64>>> {
    let dtype = column.dtype();

    if dtype.is_primitive_numeric() {
        let cast = column.cast(&DataType::Float64)?;
        return Ok(cast.f64()?.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect());
    }

    let cast = column
        .cast(&DataType::String)
        .with_context(|| format!("Column '{}' cannot be read as text", column.name()))?;

    let values = cast
        .str()?
        .into_iter()
        .map(|v| {
            v.and_then(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    trimmed.parse::<f64>().ok().filter(|x| x.is_finite())
                }
            })
        })
        .collect();

    Ok(values)
}

/// Median of a slice of values, `None` when empty
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median of the present values of an optional column
pub fn median_of_present(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
    median(&present)
}

/// Replace a column with its numeric coercion, filling missing entries.
///
/// When `fill` is `None` the median of the successfully parsed values of the
/// same column is used. Returns `false` if the column is absent.
pub fn repair_numeric_column(df: &mut DataFrame, name: &str, fill: Option<f64>) -> Result<bool> {
    let Ok(column) = df.column(name) else {
        return Ok(false);
    };

    let values = coerce_numeric(column)?;
    let fill = fill.or_else(|| median_of_present(&values));

    let repaired: Vec<Option<f64>> = values
        .into_iter()
        .map(|v| v.or(fill))
        .collect();

    df.with_column(Column::new(name.into(), repaired))
        .with_context(|| format!("Failed to replace column '{}'", name))?;

    Ok(true)
}

/// Locate, load and clean the training dataset.
///
/// `TotalCharges` is repaired with the median of the current dataset.
pub fn load_training_frame(candidates: &[PathBuf], infer_schema_length: usize) -> Result<(PathBuf, DataFrame)> {
    let path = locate_dataset(candidates)?;
    let mut df = load_csv(&path, infer_schema_length)?;
    repair_numeric_column(&mut df, TOTAL_CHARGES, None)?;
    Ok((path, df))
}
