//! `churnkit tune-threshold` - pick the F1-maximising decision threshold

use anyhow::Result;
use console::style;

use super::args::ChurnConfig;
use super::dataset::PreparedDataset;
use crate::pipeline::{
    best_f1_threshold, precision_recall_curve, roc_auc, write_threshold, ChurnPipeline, ModelFamily,
    ThresholdChoice,
};
use crate::utils::{create_spinner, finish_with_success, print_step_header, print_success};

/// Score the whole dataset with one family's pipeline and persist the
/// threshold that maximises F1.
pub fn run_tune_threshold(config: &ChurnConfig, family: ModelFamily) -> Result<(f64, ThresholdChoice)> {
    print_step_header(1, "Score Dataset");
    let pipeline = ChurnPipeline::load_family(&config.models_dir, family)?;

    let spinner = create_spinner(&format!("Scoring with {}...", family));
    let dataset = PreparedDataset::load(config)?;
    let proba = pipeline.predict_proba(&dataset.features)?;
    finish_with_success(&spinner, &format!("Scored {} rows", proba.len()));

    print_step_header(2, "Tune Threshold");
    let auc = roc_auc(&dataset.target, &proba)?;
    let curve = precision_recall_curve(&dataset.target, &proba)?;
    let choice = best_f1_threshold(&curve);

    println!(
        "    AUC={} | F1 threshold={} (P={:.3}, R={:.3})",
        style(format!("{:.4}", auc)).cyan().bold(),
        style(format!("{:.3}", choice.threshold)).yellow().bold(),
        choice.precision,
        choice.recall
    );

    let path = write_threshold(&config.models_dir, choice.threshold)?;
    print_success(&format!("Wrote {}", path.display()));

    Ok((auc, choice))
}
