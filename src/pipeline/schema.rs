//! Explicit feature schema persisted with every trained pipeline
//!
//! Column roles are inferred once from the training frame and frozen. Frames
//! presented later are checked against the schema before any transform runs,
//! so a mismatch surfaces as a [`SchemaError`] instead of a failure deep inside
//! the preprocessor.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::target::{partition_columns, IDENTIFIER_COLUMNS};

/// Current schema layout version
pub const SCHEMA_VERSION: u32 = 1;

/// Role a column plays in the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Numeric,
    Categorical,
    Identifier,
    Label,
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnRole::Numeric => "numeric",
            ColumnRole::Categorical => "categorical",
            ColumnRole::Identifier => "identifier",
            ColumnRole::Label => "label",
        };
        write!(f, "{}", name)
    }
}

/// A named column and its role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub role: ColumnRole,
}

/// Errors raised when a frame does not match a trained schema
#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    /// Feature columns seen at training time are absent
    #[error("Input is missing {} feature column(s) required by the model: {}", .0.len(), .0.join(", "))]
    MissingColumns(Vec<String>),

    /// A column cannot be used in the role it had at training time
    #[error("Column '{column}' was {expected} at training time but has type {found}")]
    IncompatibleType {
        column: String,
        expected: ColumnRole,
        found: String,
    },

    /// The artifact was written with a schema layout this build does not read
    #[error("Unsupported schema version {found} (this build reads version {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Ordered column roles of a training frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub columns: Vec<ColumnSpec>,
}

impl FeatureSchema {
    /// Infer roles from a raw (cleaned) frame: label and identifier variants by
    /// name, numeric/categorical by storage type.
    pub fn infer(df: &DataFrame, label: &str) -> Self {
        let (numeric, _) = partition_columns(df);
        let columns = df
            .get_column_names()
            .iter()
            .map(|name| {
                let name = name.to_string();
                let role = if name == label {
                    ColumnRole::Label
                } else if IDENTIFIER_COLUMNS.contains(&name.as_str()) {
                    ColumnRole::Identifier
                } else if numeric.contains(&name) {
                    ColumnRole::Numeric
                } else {
                    ColumnRole::Categorical
                };
                ColumnSpec { name, role }
            })
            .collect();

        Self {
            version: SCHEMA_VERSION,
            columns,
        }
    }

    fn names_with_role(&self, role: ColumnRole) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.role == role)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.names_with_role(ColumnRole::Numeric)
    }

    pub fn categorical_columns(&self) -> Vec<String> {
        self.names_with_role(ColumnRole::Categorical)
    }

    /// Feature columns (numeric and categorical) in training order
    pub fn feature_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| matches!(c.role, ColumnRole::Numeric | ColumnRole::Categorical))
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn role_of(&self, name: &str) -> Option<ColumnRole> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.role)
    }

    /// Reject schemas written by an incompatible layout
    pub fn check_version(&self) -> Result<(), SchemaError> {
        if self.version != SCHEMA_VERSION {
            return Err(SchemaError::UnsupportedVersion {
                found: self.version,
                supported: SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    /// Check that a frame carries every feature column in a usable type.
    ///
    /// Extra columns are ignored. Numeric columns may arrive as text; they are
    /// coerced by the preprocessor.
    pub fn validate(&self, df: &DataFrame) -> Result<(), SchemaError> {
        let missing: Vec<String> = self
            .feature_columns()
            .into_iter()
            .filter(|name| df.column(name).is_err())
            .collect();

        if !missing.is_empty() {
            return Err(SchemaError::MissingColumns(missing));
        }

        for name in self.numeric_columns() {
            if let Ok(column) = df.column(&name) {
                let dtype = column.dtype();
                let usable = dtype.is_primitive_numeric()
                    || matches!(dtype, DataType::String | DataType::Null);
                if !usable {
                    return Err(SchemaError::IncompatibleType {
                        column: name,
                        expected: ColumnRole::Numeric,
                        found: dtype.to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}
