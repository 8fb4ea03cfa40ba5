//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use churnkit::cli::ChurnConfig;
use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tempfile::TempDir;

const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];
const INTERNET: [&str; 3] = ["DSL", "Fiber optic", "No"];
const GENDERS: [&str; 2] = ["Female", "Male"];

/// Create a telco-like churn dataset with a learnable signal
///
/// Columns mirror the public telco export:
/// - `customerID`: identifier (dropped before modelling)
/// - `gender`, `Contract`, `InternetService`: categorical
/// - `SeniorCitizen`, `tenure`: integer
/// - `MonthlyCharges`: float
/// - `TotalCharges`: text with blank entries for zero-tenure customers
/// - `Churn`: "Yes"/"No", more likely for short month-to-month contracts
pub fn create_telco_dataframe(rows: usize, seed: u64) -> DataFrame {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut ids = Vec::with_capacity(rows);
    let mut genders = Vec::with_capacity(rows);
    let mut seniors = Vec::with_capacity(rows);
    let mut tenures = Vec::with_capacity(rows);
    let mut contracts = Vec::with_capacity(rows);
    let mut services = Vec::with_capacity(rows);
    let mut monthly = Vec::with_capacity(rows);
    let mut totals = Vec::with_capacity(rows);
    let mut churn = Vec::with_capacity(rows);

    for i in 0..rows {
        let contract = CONTRACTS[rng.gen_range(0..CONTRACTS.len())];
        let service = INTERNET[rng.gen_range(0..INTERNET.len())];
        let tenure: i64 = if i % 50 == 0 { 0 } else { rng.gen_range(1..72) };
        let charges = (rng.gen_range(18.0..118.0f64) * 100.0).round() / 100.0;

        let mut logit = -0.8 - 0.05 * tenure as f64 + 0.02 * (charges - 65.0);
        if contract == "Month-to-month" {
            logit += 1.6;
        }
        if service == "Fiber optic" {
            logit += 0.5;
        }
        let p = 1.0 / (1.0 + (-logit).exp());

        ids.push(format!("{:04}-CUST", i));
        genders.push(GENDERS[rng.gen_range(0..GENDERS.len())]);
        seniors.push(i64::from(rng.gen_bool(0.16)));
        tenures.push(tenure);
        contracts.push(contract);
        services.push(service);
        monthly.push(charges);
        totals.push(if tenure == 0 {
            " ".to_string()
        } else {
            format!("{:.2}", charges * tenure as f64)
        });
        churn.push(if rng.gen_bool(p) { "Yes" } else { "No" });
    }

    df! {
        "customerID" => ids,
        "gender" => genders,
        "SeniorCitizen" => seniors,
        "tenure" => tenures,
        "Contract" => contracts,
        "InternetService" => services,
        "MonthlyCharges" => monthly,
        "TotalCharges" => totals,
        "Churn" => churn,
    }
    .unwrap()
}

/// Write a DataFrame as CSV, creating parent directories
pub fn write_csv(path: &Path, df: &mut DataFrame) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let mut file = std::fs::File::create(path).unwrap();
    CsvWriter::new(&mut file).include_header(true).finish(df).unwrap();
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test_data.csv");
    write_csv(&csv_path, df);
    (temp_dir, csv_path)
}

/// Temporary project with `data/telco.csv` and a config pointing into it
pub fn create_workspace(rows: usize, seed: u64) -> (TempDir, ChurnConfig) {
    let temp_dir = TempDir::new().unwrap();
    let data_path = temp_dir.path().join("data").join("telco.csv");
    write_csv(&data_path, &mut create_telco_dataframe(rows, seed));

    let config = ChurnConfig {
        data_candidates: vec![data_path],
        models_dir: temp_dir.path().join("models"),
        reports_dir: temp_dir.path().join("reports"),
        ..Default::default()
    };
    (temp_dir, config)
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
