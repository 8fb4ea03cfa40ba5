//! Tests for batch prediction, thresholds and the explainer

use churnkit::cli::{
    default_prediction_path, run_explain, run_predict, run_train, run_tune_threshold, score_frame,
};
use churnkit::pipeline::*;
use churnkit::report::{TOP_NEGATIVE_FILE, TOP_POSITIVE_FILE};
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::assert_has_columns;

fn trained_workspace(rows: usize, seed: u64) -> (tempfile::TempDir, churnkit::cli::ChurnConfig) {
    let (dir, config) = common::create_workspace(rows, seed);
    let settings = ModelSettings {
        rf_trees: 10,
        xgb_rounds: 10,
        lgbm_rounds: 10,
        ..Default::default()
    };
    run_train(&config, &[ModelFamily::LogReg], &settings).unwrap();
    (dir, config)
}

#[test]
fn test_predict_appends_columns_next_to_input() {
    let (dir, config) = trained_workspace(250, 21);
    let input = dir.path().join("new_customers.csv");
    common::write_csv(&input, &mut common::create_telco_dataframe(30, 99));

    let outcome = run_predict(&config, &input, None, ModelFamily::LogReg).unwrap();
    assert_eq!(outcome.output, dir.path().join("new_customers.pred.csv"));
    assert_eq!(outcome.rows, 30);
    assert_eq!(outcome.threshold, 0.5);

    let scored = load_csv(&outcome.output, 10000).unwrap();
    assert_eq!(scored.height(), 30);
    assert_has_columns(&scored, &["customerID", "Churn", "churn_proba", "churn_pred"]);

    let proba = scored.column("churn_proba").unwrap().f64().unwrap();
    assert!(proba.into_iter().all(|p| p.is_some_and(|p| (0.0..=1.0).contains(&p))));
}

#[test]
fn test_predict_is_idempotent() {
    let (dir, config) = trained_workspace(250, 22);
    let input = dir.path().join("batch.csv");
    common::write_csv(&input, &mut common::create_telco_dataframe(40, 5));

    let first = run_predict(&config, &input, None, ModelFamily::LogReg).unwrap();
    let first_bytes = std::fs::read(&first.output).unwrap();
    let second = run_predict(&config, &input, None, ModelFamily::LogReg).unwrap();
    let second_bytes = std::fs::read(&second.output).unwrap();

    assert_eq!(first_bytes, second_bytes);
}

#[test]
fn test_predict_uses_tuned_threshold() {
    let (dir, config) = trained_workspace(250, 23);
    write_threshold(&config.models_dir, 0.0).unwrap();

    let input = dir.path().join("all.csv");
    common::write_csv(&input, &mut common::create_telco_dataframe(20, 8));
    let outcome = run_predict(&config, &input, None, ModelFamily::LogReg).unwrap();

    assert_eq!(outcome.threshold, 0.0);
    assert_eq!(outcome.predicted_churn, 20);
}

#[test]
fn test_invalid_threshold_falls_back_with_warning() {
    let (dir, config) = trained_workspace(250, 29);
    std::fs::create_dir_all(&config.models_dir).unwrap();
    std::fs::write(config.models_dir.join(THRESHOLD_FILE), "not-a-number\n").unwrap();

    let input = dir.path().join("batch.csv");
    common::write_csv(&input, &mut common::create_telco_dataframe(15, 4));
    let outcome = run_predict(&config, &input, None, ModelFamily::LogReg).unwrap();

    assert_eq!(outcome.threshold, 0.5);
    let warning = outcome.threshold_warning.unwrap();
    assert!(warning.contains("not-a-number"));
}

#[test]
fn test_blank_charges_use_frozen_median() {
    let (_dir, config) = trained_workspace(250, 24);
    let pipeline = ChurnPipeline::load_family(&config.models_dir, ModelFamily::LogReg).unwrap();
    let frozen = pipeline.preprocessor.median_for(TOTAL_CHARGES).unwrap();

    let df = df! {
        "gender" => ["Female", "Male"],
        "SeniorCitizen" => [0i64, 1],
        "tenure" => [0i64, 12],
        "Contract" => ["Month-to-month", "Lifetime"],
        "InternetService" => ["DSL", "Satellite"],
        "MonthlyCharges" => [50.0f64, 80.0],
        "TotalCharges" => [" ", "960.00"],
    }
    .unwrap();

    let scored = score_frame(&pipeline, &df, "Churn", 0.5).unwrap();
    let charges = scored.column(TOTAL_CHARGES).unwrap().f64().unwrap();
    assert_eq!(charges.get(0), Some(frozen));
    assert_eq!(charges.get(1), Some(960.0));

    // Unknown categories still score
    let proba = scored.column("churn_proba").unwrap().f64().unwrap();
    assert!(proba.get(1).unwrap().is_finite());
}

#[test]
fn test_predict_rejects_missing_feature_columns() {
    let (dir, config) = trained_workspace(250, 25);
    let input = dir.path().join("partial.csv");
    let mut df = common::create_telco_dataframe(10, 1).drop_many(["Contract"]);
    common::write_csv(&input, &mut df);

    let err = run_predict(&config, &input, None, ModelFamily::LogReg).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SchemaError>(),
        Some(SchemaError::MissingColumns(_))
    ));
    assert!(!default_prediction_path(&input).exists());
}

#[test]
fn test_predict_missing_input_file() {
    let (dir, config) = trained_workspace(250, 26);
    let err = run_predict(&config, &dir.path().join("nope.csv"), None, ModelFamily::LogReg).unwrap_err();
    assert!(err.to_string().contains("Input file not found"));
}

#[test]
fn test_tune_threshold_writes_valid_value() {
    let (_dir, config) = trained_workspace(300, 27);
    let (auc, choice) = run_tune_threshold(&config, ModelFamily::LogReg).unwrap();

    assert!((0.0..=1.0).contains(&auc));
    assert!((0.0..=1.0).contains(&choice.threshold));

    let text = std::fs::read_to_string(config.models_dir.join(THRESHOLD_FILE)).unwrap();
    assert_eq!(text, format!("{:.4}\n", choice.threshold));
    assert!((read_threshold(&config.models_dir).value - choice.threshold).abs() < 1e-4);
}

#[test]
fn test_explain_writes_ranked_weights() {
    let (_dir, config) = trained_workspace(250, 28);
    let (positive, negative) = run_explain(&config, 3).unwrap();

    assert!(positive.ends_with(TOP_POSITIVE_FILE));
    assert!(negative.ends_with(TOP_NEGATIVE_FILE));

    let read_weights = |path: &std::path::Path| -> Vec<f64> {
        let text = std::fs::read_to_string(path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("feature,weight"));
        lines
            .map(|l| l.rsplit(',').next().unwrap().parse::<f64>().unwrap())
            .collect()
    };

    let pos = read_weights(&positive);
    let neg = read_weights(&negative);
    assert_eq!(pos.len(), 3);
    assert_eq!(neg.len(), 3);
    assert!(pos.windows(2).all(|w| w[0] >= w[1]));
    assert!(neg.windows(2).all(|w| w[0] <= w[1]));
    assert!(pos[0] >= neg[0]);
}

#[test]
fn test_explain_requires_logreg_artifact() {
    let (_dir, config) = common::create_workspace(100, 3);
    assert!(run_explain(&config, 15).is_err());
}
