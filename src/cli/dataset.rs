//! Training dataset shared by the train, evaluate and tune-threshold stages

use std::path::PathBuf;

use anyhow::Result;
use polars::prelude::*;

use super::args::ChurnConfig;
use crate::pipeline::{
    load_training_frame, require_label, split_features_target, stratified_split, take_labels, take_rows,
    FeatureSchema, SplitIndices,
};

/// Cleaned dataset with its target, schema and held-out split
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub path: PathBuf,
    pub schema: FeatureSchema,
    pub features: DataFrame,
    pub target: Vec<u8>,
    pub split: SplitIndices,
}

impl PreparedDataset {
    /// Locate, load and clean the dataset, then recompute the held-out split.
    ///
    /// The split depends only on the labels, the test size and the seed, so
    /// every stage sees the same held-out rows.
    pub fn load(config: &ChurnConfig) -> Result<Self> {
        let (path, raw) = load_training_frame(&config.data_candidates, config.infer_schema_length)?;
        require_label(&raw, &config.label)?;

        let schema = FeatureSchema::infer(&raw, &config.label);
        let (features, target) = split_features_target(&raw, &config.label)?;
        let split = stratified_split(&target, config.test_size, config.seed)?;

        Ok(Self {
            path,
            schema,
            features,
            target,
            split,
        })
    }

    pub fn rows(&self) -> usize {
        self.target.len()
    }

    pub fn positives(&self) -> usize {
        self.target.iter().filter(|&&v| v == 1).count()
    }

    pub fn train_features(&self) -> Result<DataFrame> {
        take_rows(&self.features, &self.split.train)
    }

    pub fn train_target(&self) -> Vec<u8> {
        take_labels(&self.target, &self.split.train)
    }

    pub fn test_features(&self) -> Result<DataFrame> {
        take_rows(&self.features, &self.split.test)
    }

    pub fn test_target(&self) -> Vec<u8> {
        take_labels(&self.target, &self.split.test)
    }
}
