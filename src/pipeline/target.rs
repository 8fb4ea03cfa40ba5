//! Target derivation and feature/target splitting
//!
//! The label column holds free-form text such as "Yes"/"No". Any value whose
//! lowercase text form is one of [`TRUTHY_VALUES`] maps to 1, everything else
//! (including nulls) maps to 0.

use anyhow::{Context, Result};
use polars::prelude::*;

/// Default label column name
pub const DEFAULT_LABEL: &str = "Churn";

/// Identifier column name variants dropped from the feature matrix
pub const IDENTIFIER_COLUMNS: [&str; 3] = ["customerID", "CustomerID", "customerId"];

/// Lowercase label values that count as churn
pub const TRUTHY_VALUES: [&str; 3] = ["yes", "1", "true"];

/// Fail with the available column names if the label column is missing
pub fn require_label(df: &DataFrame, label: &str) -> Result<()> {
    let columns: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    if !columns.iter().any(|c| c == label) {
        anyhow::bail!(
            "Label column '{}' not found in dataset. Available columns: {:?}",
            label,
            columns
        );
    }
    Ok(())
}

/// Derive the binary target (1 = churn) from the label column
pub fn derive_target(df: &DataFrame, label: &str) -> Result<Vec<u8>> {
    require_label(df, label)?;

    let column = df
        .column(label)
        .with_context(|| format!("Label column '{}' not found", label))?;
    let text = column
        .cast(&DataType::String)
        .with_context(|| format!("Label column '{}' cannot be read as text", label))?;

    let target = text
        .str()?
        .into_iter()
        .map(|v| match v {
            Some(s) if is_truthy(s) => 1u8,
            _ => 0u8,
        })
        .collect();

    Ok(target)
}

/// Case-insensitive membership test against [`TRUTHY_VALUES`]
pub fn is_truthy(value: &str) -> bool {
    let lowered = value.to_lowercase();
    TRUTHY_VALUES.contains(&lowered.as_str())
}

/// Names of identifier and label columns present in the frame
pub fn non_feature_columns(df: &DataFrame, label: &str) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .filter(|name| name == label || IDENTIFIER_COLUMNS.contains(&name.as_str()))
        .collect()
}

/// Drop the label column and identifier variants, whichever are present
pub fn drop_identifiers_and_label(df: &DataFrame, label: &str) -> DataFrame {
    let to_drop = non_feature_columns(df, label);
    df.drop_many(to_drop.iter().map(|s| s.as_str()))
}

/// Split a cleaned dataset into the feature frame and binary target
pub fn split_features_target(df: &DataFrame, label: &str) -> Result<(DataFrame, Vec<u8>)> {
    let target = derive_target(df, label)?;
    let features = drop_identifiers_and_label(df, label);
    Ok((features, target))
}

/// Partition feature columns into (numeric, categorical) by storage type
pub fn partition_columns(df: &DataFrame) -> (Vec<String>, Vec<String>) {
    let mut numeric = Vec::new();
    let mut categorical = Vec::new();

    for column in df.get_columns() {
        let name = column.name().to_string();
        if column.dtype().is_primitive_numeric() {
            numeric.push(name);
        } else {
            categorical.push(name);
        }
    }

    (numeric, categorical)
}
