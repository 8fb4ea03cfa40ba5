//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::pipeline::{ModelFamily, ModelSettings, DEFAULT_DATA_CANDIDATES};

/// churnkit - Train, evaluate and serve customer churn classifiers
#[derive(Parser, Debug)]
#[command(name = "churnkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Dataset CSV path. Repeat to give fallbacks; the first existing file is used.
    /// Defaults to data/WA_Fn-UseC_-Telco-Customer-Churn.csv, then data/telco.csv.
    #[arg(long = "data", global = true)]
    pub data: Vec<PathBuf>,

    /// Directory holding persisted pipelines and the tuned threshold
    #[arg(long, default_value = "models", global = true)]
    pub models_dir: PathBuf,

    /// Directory receiving metrics and feature reports
    #[arg(long, default_value = "reports", global = true)]
    pub reports_dir: PathBuf,

    /// Label column name ("Yes"/"1"/"true" count as churn)
    #[arg(long, default_value = "Churn", global = true)]
    pub label: String,

    /// Random seed for the held-out split and the tree ensembles
    #[arg(long, default_value = "42", global = true)]
    pub seed: u64,

    /// Held-out proportion for training and evaluation (exclusive 0 to 1)
    #[arg(long, default_value = "0.25", value_parser = validate_test_size, global = true)]
    pub test_size: f64,

    /// Number of rows to use for CSV schema inference.
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000", global = true)]
    pub infer_schema_length: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fit every model family on the training split and save the pipelines
    Train {
        /// Model families to train (comma-separated: logreg,rf,xgb,lgbm). Defaults to all.
        #[arg(long, value_delimiter = ',', value_parser = parse_family)]
        families: Vec<ModelFamily>,

        /// Number of random forest trees
        #[arg(long, default_value = "400", value_parser = validate_positive_count)]
        rf_trees: usize,

        /// Number of depth-wise boosting rounds (xgb)
        #[arg(long, default_value = "500", value_parser = validate_positive_count)]
        xgb_rounds: usize,

        /// Number of leaf-wise boosting rounds (lgbm)
        #[arg(long, default_value = "600", value_parser = validate_positive_count)]
        lgbm_rounds: usize,

        /// Inverse L2 regularisation strength for logistic regression
        #[arg(long, default_value = "1.0", value_parser = validate_positive_c)]
        logreg_c: f64,
    },

    /// Score saved pipelines on the held-out split and write reports/metrics.md
    Evaluate,

    /// Choose the F1-maximising decision threshold for the primary model
    TuneThreshold {
        /// Model family whose pipeline is tuned
        #[arg(long, default_value = "logreg", value_parser = parse_family)]
        model: ModelFamily,
    },

    /// Export the largest positive and negative logistic regression weights
    Explain {
        /// Number of features per list
        #[arg(long, default_value = "15")]
        top: usize,
    },

    /// Score a CSV file and write <input>.pred.csv next to it
    Predict {
        /// CSV file to score
        csv: Option<PathBuf>,

        /// Output path (defaults to the input with a .pred.csv extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Model family whose pipeline is used
        #[arg(long, default_value = "logreg", value_parser = parse_family)]
        model: ModelFamily,
    },
}

/// Paths and split parameters shared by every subcommand
#[derive(Debug, Clone, PartialEq)]
pub struct ChurnConfig {
    pub data_candidates: Vec<PathBuf>,
    pub models_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub label: String,
    pub seed: u64,
    pub test_size: f64,
    pub infer_schema_length: usize,
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            data_candidates: DEFAULT_DATA_CANDIDATES.iter().map(PathBuf::from).collect(),
            models_dir: PathBuf::from("models"),
            reports_dir: PathBuf::from("reports"),
            label: crate::pipeline::DEFAULT_LABEL.to_string(),
            seed: crate::pipeline::DEFAULT_SEED,
            test_size: crate::pipeline::DEFAULT_TEST_SIZE,
            infer_schema_length: 10000,
        }
    }
}

impl Cli {
    /// Collect the global options, filling in default dataset candidates
    pub fn config(&self) -> ChurnConfig {
        let data_candidates = if self.data.is_empty() {
            DEFAULT_DATA_CANDIDATES.iter().map(PathBuf::from).collect()
        } else {
            self.data.clone()
        };

        ChurnConfig {
            data_candidates,
            models_dir: self.models_dir.clone(),
            reports_dir: self.reports_dir.clone(),
            label: self.label.clone(),
            seed: self.seed,
            test_size: self.test_size,
            infer_schema_length: self.infer_schema_length,
        }
    }

    /// Model settings of a `train` invocation, seeded from the global seed
    pub fn model_settings(&self) -> ModelSettings {
        match &self.command {
            Commands::Train {
                rf_trees,
                xgb_rounds,
                lgbm_rounds,
                logreg_c,
                ..
            } => ModelSettings {
                rf_trees: *rf_trees,
                xgb_rounds: *xgb_rounds,
                lgbm_rounds: *lgbm_rounds,
                logreg_c: *logreg_c,
                seed: self.seed,
            },
            _ => ModelSettings {
                seed: self.seed,
                ..Default::default()
            },
        }
    }
}

/// Requested families with duplicates removed; all families when none given
pub fn resolve_families(requested: &[ModelFamily]) -> Vec<ModelFamily> {
    if requested.is_empty() {
        return ModelFamily::ALL.to_vec();
    }
    let mut families = Vec::new();
    for family in requested {
        if !families.contains(family) {
            families.push(*family);
        }
    }
    families
}

fn parse_family(s: &str) -> Result<ModelFamily, String> {
    s.parse::<ModelFamily>().map_err(|e| e.to_string())
}

/// Validator for test_size parameter
fn validate_test_size(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!(
            "test_size must be between 0.0 and 1.0 (exclusive), got {}",
            value
        ))
    }
}

/// Validator for tree and round counts
fn validate_positive_count(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;

    if value == 0 {
        Err("count must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

/// Validator for logreg_c parameter
fn validate_positive_c(s: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;

    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("logreg_c must be a positive number, got {}", value))
    }
}
