//! Column-wise preprocessing shared by every model family
//!
//! Numeric columns are median-imputed and standardised, categorical columns are
//! one-hot encoded against the vocabulary seen during fitting. All learned
//! statistics are frozen at fit time and serialised with the pipeline.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::loader::{coerce_numeric, median_of_present};
use super::schema::FeatureSchema;

/// Fitted parameters of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    /// Imputation value for missing entries
    pub median: f64,
    pub mean: f64,
    /// Population standard deviation, 1.0 for constant columns
    pub scale: f64,
}

/// Fitted vocabulary of one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    /// Sorted distinct values seen at fit time
    pub categories: Vec<String>,
}

/// Standard scaling + one-hot encoding over a fixed schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub schema: FeatureSchema,
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
}

impl Preprocessor {
    /// Learn imputation, scaling and vocabulary from a training feature frame
    pub fn fit(features: &DataFrame, schema: &FeatureSchema) -> Result<Self> {
        schema.validate(features)?;

        if features.height() == 0 {
            anyhow::bail!("Cannot fit preprocessing on an empty frame");
        }

        let mut numeric = Vec::new();
        for name in schema.numeric_columns() {
            let values = coerce_numeric(features.column(&name)?)?;
            let median = median_of_present(&values).unwrap_or(0.0);
            let filled: Vec<f64> = values.iter().map(|v| v.unwrap_or(median)).collect();

            let n = filled.len() as f64;
            let mean = filled.iter().sum::<f64>() / n;
            let variance = filled.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            let scale = if std > f64::EPSILON { std } else { 1.0 };

            numeric.push(NumericColumn {
                name,
                median,
                mean,
                scale,
            });
        }

        let mut categorical = Vec::new();
        for name in schema.categorical_columns() {
            let values = category_values(features, &name)?;
            let categories: BTreeSet<String> = values.into_iter().flatten().collect();
            categorical.push(CategoricalColumn {
                name,
                categories: categories.into_iter().collect(),
            });
        }

        Ok(Self {
            schema: schema.clone(),
            numeric,
            categorical,
        })
    }

    /// Width of the transformed matrix
    pub fn n_outputs(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    /// Expanded feature names: numeric names, then `<column>_<category>`
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.numeric.iter().map(|c| c.name.clone()).collect();
        for column in &self.categorical {
            for category in &column.categories {
                names.push(format!("{}_{}", column.name, category));
            }
        }
        names
    }

    /// Frozen training median of a numeric column
    pub fn median_for(&self, name: &str) -> Option<f64> {
        self.numeric.iter().find(|c| c.name == name).map(|c| c.median)
    }

    /// Transform a frame into the model input matrix.
    ///
    /// The frame is validated against the schema first. Columns not in the
    /// schema are ignored; unknown or missing categories produce all-zero
    /// indicator blocks.
    pub fn transform(&self, features: &DataFrame) -> Result<Array2<f64>> {
        self.schema.validate(features)?;

        let n_rows = features.height();
        let mut matrix = Array2::<f64>::zeros((n_rows, self.n_outputs()));

        for (j, column) in self.numeric.iter().enumerate() {
            let values = coerce_numeric(features.column(&column.name)?)
                .with_context(|| format!("Failed to read numeric column '{}'", column.name))?;
            for (i, value) in values.into_iter().enumerate() {
                let v = value.unwrap_or(column.median);
                matrix[[i, j]] = (v - column.mean) / column.scale;
            }
        }

        let mut offset = self.numeric.len();
        for column in &self.categorical {
            let values = category_values(features, &column.name)?;
            for (i, value) in values.iter().enumerate() {
                if let Some(value) = value {
                    if let Ok(k) = column.categories.binary_search(value) {
                        matrix[[i, offset + k]] = 1.0;
                    }
                }
            }
            offset += column.categories.len();
        }

        Ok(matrix)
    }
}

/// Read a column as optional text values
fn category_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .with_context(|| format!("Categorical column '{}' not found", name))?;
    let text = column
        .cast(&DataType::String)
        .with_context(|| format!("Column '{}' cannot be read as text", name))?;

    Ok(text
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn training_frame() -> DataFrame {
        df! {
            "tenure" => [Some(1.0f64), Some(3.0), None, Some(5.0)],
            "Contract" => ["Month-to-month", "Two year", "One year", "Two year"],
        }
        .unwrap()
    }

    fn fitted() -> Preprocessor {
        let df = training_frame();
        let schema = FeatureSchema::infer(&df, "Churn");
        Preprocessor::fit(&df, &schema).unwrap()
    }

    #[test]
    fn test_fit_learns_statistics() {
        let pre = fitted();

        // Missing tenure imputed with median 3.0 -> [1, 3, 3, 5]
        let tenure = &pre.numeric[0];
        assert_eq!(tenure.median, 3.0);
        assert!((tenure.mean - 3.0).abs() < 1e-12);
        assert!((tenure.scale - 2.0f64.sqrt()).abs() < 1e-12);

        assert_eq!(
            pre.categorical[0].categories,
            vec!["Month-to-month", "One year", "Two year"]
        );
    }

    #[test]
    fn test_feature_names() {
        let pre = fitted();
        assert_eq!(
            pre.feature_names(),
            vec![
                "tenure",
                "Contract_Month-to-month",
                "Contract_One year",
                "Contract_Two year"
            ]
        );
    }

    #[test]
    fn test_transform_scales_and_encodes() {
        let pre = fitted();
        let x = pre.transform(&training_frame()).unwrap();

        assert_eq!(x.dim(), (4, 4));
        assert!((x[[1, 0]]).abs() < 1e-12);
        assert_eq!(x.row(0).to_vec()[1..], [1.0, 0.0, 0.0]);
        assert_eq!(x.row(1).to_vec()[1..], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_unknown_category_is_all_zero() {
        let pre = fitted();
        let df = df! {
            "tenure" => [2.0f64],
            "Contract" => ["Lifetime"],
        }
        .unwrap();

        let x = pre.transform(&df).unwrap();
        assert_eq!(x.row(0).to_vec()[1..], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_transform_uses_frozen_median() {
        let pre = fitted();
        let df = df! {
            "tenure" => [None::<f64>],
            "Contract" => ["Two year"],
        }
        .unwrap();

        let x = pre.transform(&df).unwrap();
        // Frozen median 3.0 equals the training mean, so the scaled value is 0
        assert!(x[[0, 0]].abs() < 1e-12);
    }

    #[test]
    fn test_transform_missing_column_is_schema_error() {
        let pre = fitted();
        let df = df! { "tenure" => [2.0f64] }.unwrap();

        let err = pre.transform(&df).unwrap_err();
        assert!(err.downcast_ref::<crate::pipeline::schema::SchemaError>().is_some());
    }

    #[test]
    fn test_constant_column_scale_is_one() {
        let df = df! { "x" => [4.0f64, 4.0, 4.0] }.unwrap();
        let schema = FeatureSchema::infer(&df, "Churn");
        let pre = Preprocessor::fit(&df, &schema).unwrap();
        assert_eq!(pre.numeric[0].scale, 1.0);
    }
}
