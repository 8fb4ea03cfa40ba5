//! `churnkit evaluate` - score saved pipelines on the held-out split

use std::path::Path;

use anyhow::Result;
use polars::prelude::DataFrame;

use super::args::ChurnConfig;
use super::dataset::PreparedDataset;
use crate::pipeline::{artifact_path, ChurnPipeline, ModelFamily, ModelScore, DEFAULT_THRESHOLD};
use crate::report::{
    display_metrics_table, rank_by_auc, write_confusion_csv, write_metrics_markdown, EvaluatedModel,
};
use crate::utils::{create_spinner, finish_with_success, print_info, print_step_header, print_success, print_warning};

fn evaluate_artifact(path: &Path, x_test: &DataFrame, y_test: &[u8]) -> Result<ModelScore> {
    let pipeline = ChurnPipeline::load(path)?;
    let proba = pipeline.predict_proba(x_test)?;
    ModelScore::compute(y_test, &proba, DEFAULT_THRESHOLD)
}

/// Evaluate every saved family and write the metrics reports.
///
/// Returns the models ranked by descending ROC-AUC.
pub fn run_evaluate(config: &ChurnConfig) -> Result<Vec<EvaluatedModel>> {
    print_step_header(1, "Load Dataset");
    let spinner = create_spinner("Recomputing held-out split...");
    let dataset = PreparedDataset::load(config)?;
    let x_test = dataset.test_features()?;
    let y_test = dataset.test_target();
    finish_with_success(
        &spinner,
        &format!("{} held-out rows from {}", y_test.len(), dataset.path.display()),
    );

    print_step_header(2, "Evaluate Models");
    let mut evaluated = Vec::new();
    for family in ModelFamily::ALL {
        let path = artifact_path(&config.models_dir, family);
        if !path.exists() {
            continue;
        }
        if !family.is_available() {
            print_warning(&format!("Model family '{}' is not available in this build, skipping", family));
            continue;
        }

        match evaluate_artifact(&path, &x_test, &y_test) {
            Ok(score) => {
                print_info(&format!("{} evaluated", family));
                evaluated.push(EvaluatedModel { family, score });
            }
            Err(e) => print_warning(&format!("Could not evaluate {}: {:#}", family, e)),
        }
    }

    if evaluated.is_empty() {
        anyhow::bail!(
            "No trained model could be evaluated in {}. Run `churnkit train` first.",
            config.models_dir.display()
        );
    }

    let ranked = rank_by_auc(evaluated);
    let metrics_path = write_metrics_markdown(&config.reports_dir, &ranked)?;
    for model in &ranked {
        write_confusion_csv(&config.reports_dir, model.family, &model.score.confusion)?;
    }

    display_metrics_table(&ranked);
    println!();
    print_success(&format!(
        "Wrote {} and {} confusion matrix file(s)",
        metrics_path.display(),
        ranked.len()
    ));

    Ok(ranked)
}
