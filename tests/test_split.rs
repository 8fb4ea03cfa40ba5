//! Tests for the stratified held-out split

use churnkit::cli::PreparedDataset;
use churnkit::pipeline::{stratified_split, take_rows};

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_thousand_rows_twenty_percent_churn() {
    let labels: Vec<u8> = (0..1000).map(|i| u8::from(i % 5 == 0)).collect();
    let split = stratified_split(&labels, 0.25, 42).unwrap();

    assert_eq!(split.test.len(), 250);
    assert_eq!(split.test.iter().filter(|&&i| labels[i] == 1).count(), 50);
    assert_eq!(split.train.iter().filter(|&&i| labels[i] == 1).count(), 150);
}

#[test]
fn test_split_rows_follow_indices() {
    let df = common::create_telco_dataframe(40, 9);
    let labels: Vec<u8> = (0..40).map(|i| u8::from(i % 4 == 0)).collect();
    let split = stratified_split(&labels, 0.25, 42).unwrap();

    let test_rows = take_rows(&df, &split.test).unwrap();
    assert_eq!(test_rows.height(), 10);

    let first_id = test_rows.column("customerID").unwrap().str().unwrap().get(0).unwrap().to_string();
    assert_eq!(first_id, format!("{:04}-CUST", split.test[0]));
}

#[test]
fn test_stages_see_identical_held_out_rows() {
    let (_dir, config) = common::create_workspace(200, 5);

    let first = PreparedDataset::load(&config).unwrap();
    let second = PreparedDataset::load(&config).unwrap();

    assert_eq!(first.split, second.split);
    assert_eq!(first.test_target(), second.test_target());
    assert_eq!(first.split.test.len(), 50);
}
