//! `churnkit train` - fit and persist one pipeline per model family

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use polars::prelude::DataFrame;

use super::args::ChurnConfig;
use super::dataset::PreparedDataset;
use crate::pipeline::{
    accuracy, artifact_path, roc_auc, threshold_predictions, ChurnPipeline, FeatureSchema, ModelFamily,
    ModelSettings, DEFAULT_THRESHOLD,
};
use crate::report::{TrainingStatus, TrainingSummary};
use crate::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_config, print_info, print_step_header,
    print_step_time, print_success, print_warning,
};

/// Held-out training data handed to each family
struct TrainingData<'a> {
    schema: &'a FeatureSchema,
    x_train: &'a DataFrame,
    y_train: &'a [u8],
    x_test: &'a DataFrame,
    y_test: &'a [u8],
}

/// Fit, score and save one family. Any error stays local to this family.
fn train_family(
    family: ModelFamily,
    data: &TrainingData<'_>,
    settings: &ModelSettings,
    models_dir: &Path,
) -> Result<(f64, f64, PathBuf)> {
    let pipeline = ChurnPipeline::fit(family, data.schema, data.x_train, data.y_train, settings)?;

    let proba = pipeline.predict_proba(data.x_test)?;
    let predictions = threshold_predictions(&proba, DEFAULT_THRESHOLD);
    let acc = accuracy(data.y_test, &predictions)?;
    let auc = roc_auc(data.y_test, &proba)?;

    let path = artifact_path(models_dir, family);
    pipeline.save(&path)?;
    Ok((acc, auc, path))
}

/// Train the requested families on the stratified training split.
///
/// Families without a backend in this build are skipped; failing families are
/// reported and excluded. Errors only when no family was trained.
pub fn run_train(config: &ChurnConfig, families: &[ModelFamily], settings: &ModelSettings) -> Result<TrainingSummary> {
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let spinner = create_spinner("Loading and cleaning dataset...");
    let dataset = PreparedDataset::load(config)?;
    finish_with_success(&spinner, "Dataset loaded");

    print_config(&dataset.path, &config.label, &config.models_dir, config.test_size, config.seed);
    print_info(&format!(
        "{} rows, {} feature columns ({} numeric, {} categorical)",
        dataset.rows(),
        dataset.schema.feature_columns().len(),
        dataset.schema.numeric_columns().len(),
        dataset.schema.categorical_columns().len()
    ));
    print_step_time(step_start.elapsed());

    let x_train = dataset.train_features()?;
    let y_train = dataset.train_target();
    let x_test = dataset.test_features()?;
    let y_test = dataset.test_target();
    let data = TrainingData {
        schema: &dataset.schema,
        x_train: &x_train,
        y_train: &y_train,
        x_test: &x_test,
        y_test: &y_test,
    };

    let mut summary = TrainingSummary::new(dataset.rows(), dataset.positives(), y_train.len(), y_test.len());

    print_step_header(2, "Train Models");
    for &family in families {
        if !family.is_available() {
            print_warning(&format!("Model family '{}' is not available in this build, skipping", family));
            summary.record(family, TrainingStatus::Skipped("backend not built".to_string()));
            continue;
        }

        let started = Instant::now();
        let spinner = create_spinner(&format!("Fitting {}...", family));
        match train_family(family, &data, settings, &config.models_dir) {
            Ok((accuracy, roc_auc, artifact)) => {
                finish_with_success(
                    &spinner,
                    &format!("{} ACC={:.4} AUC={:.4}", family, accuracy, roc_auc),
                );
                summary.record(
                    family,
                    TrainingStatus::Trained {
                        accuracy,
                        roc_auc,
                        artifact,
                        elapsed: started.elapsed(),
                    },
                );
            }
            Err(e) => {
                finish_with_warning(&spinner, &format!("{} failed", family));
                print_warning(&format!("{}: {:#}", family, e));
                summary.record(family, TrainingStatus::Failed(format!("{:#}", e)));
            }
        }
    }

    summary.display();

    if summary.trained_count() == 0 {
        anyhow::bail!("No model family could be trained");
    }
    print_success(&format!(
        "Saved {} pipeline(s) to {}",
        summary.trained_count(),
        config.models_dir.display()
    ));

    Ok(summary)
}
