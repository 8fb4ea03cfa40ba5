//! `churnkit predict` - batch scoring of a CSV file

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;

use super::args::ChurnConfig;
use crate::pipeline::{
    drop_identifiers_and_label, load_csv, read_threshold, repair_numeric_column, threshold_predictions,
    ChurnPipeline, ModelFamily, TOTAL_CHARGES,
};
use crate::utils::{create_spinner, finish_with_success, print_success, print_warning};

/// Appended probability column
pub const PROBA_COLUMN: &str = "churn_proba";

/// Appended hard prediction column
pub const PRED_COLUMN: &str = "churn_pred";

/// Result of one prediction run
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    pub output: PathBuf,
    pub rows: usize,
    pub predicted_churn: usize,
    pub threshold: f64,
    /// Set when a stored threshold was rejected in favour of the default
    pub threshold_warning: Option<String>,
}

/// `<dir>/<stem>.pred.csv` next to the input
pub fn default_prediction_path(input: &Path) -> PathBuf {
    input.with_extension("pred.csv")
}

/// Copy of `df` with probability and prediction columns appended
pub fn score_frame(pipeline: &ChurnPipeline, df: &DataFrame, label: &str, threshold: f64) -> Result<DataFrame> {
    let mut repaired = df.clone();
    repair_numeric_column(&mut repaired, TOTAL_CHARGES, pipeline.preprocessor.median_for(TOTAL_CHARGES))?;

    let features = drop_identifiers_and_label(&repaired, label);
    let proba = pipeline.predict_proba(&features)?;
    let predictions: Vec<i32> = threshold_predictions(&proba, threshold)
        .into_iter()
        .map(i32::from)
        .collect();

    repaired
        .with_column(Column::new(PROBA_COLUMN.into(), proba))
        .with_context(|| format!("Failed to add column '{}'", PROBA_COLUMN))?;
    repaired
        .with_column(Column::new(PRED_COLUMN.into(), predictions))
        .with_context(|| format!("Failed to add column '{}'", PRED_COLUMN))?;

    Ok(repaired)
}

/// Score `input` with the chosen family's pipeline and the tuned threshold
pub fn run_predict(
    config: &ChurnConfig,
    input: &Path,
    output: Option<&Path>,
    family: ModelFamily,
) -> Result<PredictionOutcome> {
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    let pipeline = ChurnPipeline::load_family(&config.models_dir, family)?;
    let stored = read_threshold(&config.models_dir);
    if let Some(warning) = &stored.warning {
        print_warning(warning);
    }
    let threshold = stored.value;

    let spinner = create_spinner(&format!("Scoring {}...", input.display()));
    let df = load_csv(input, config.infer_schema_length)?;
    let mut scored = score_frame(&pipeline, &df, &config.label, threshold)?;

    let out_path = output.map(Path::to_path_buf).unwrap_or_else(|| default_prediction_path(input));
    let mut file = File::create(&out_path)
        .with_context(|| format!("Failed to create output file: {}", out_path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut scored)
        .with_context(|| format!("Failed to write predictions: {}", out_path.display()))?;

    let predicted_churn = scored
        .column(PRED_COLUMN)?
        .i32()?
        .into_iter()
        .filter(|v| *v == Some(1))
        .count();
    finish_with_success(&spinner, "Predictions written");

    print_success(&format!(
        "{} rows predicted -> {} (threshold={:.3})",
        scored.height(),
        out_path.display(),
        threshold
    ));

    Ok(PredictionOutcome {
        output: out_path,
        rows: scored.height(),
        predicted_churn,
        threshold,
        threshold_warning: stored.warning,
    })
}
