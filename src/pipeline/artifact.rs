//! Persisted pipeline and threshold artifacts
//!
//! A pipeline artifact is one JSON document holding the feature schema, the
//! fitted preprocessor and the fitted classifier of one model family. Floats
//! are written with round-trip precision, so a reloaded pipeline reproduces
//! the probabilities of the one that was saved.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::metrics::DEFAULT_THRESHOLD;
use super::models::{Classifier, FittedModel, ModelFamily, ModelSettings};
use super::preprocess::Preprocessor;
use super::schema::FeatureSchema;

/// Artifact layout version
pub const FORMAT_VERSION: u32 = 1;

/// File name of the tuned decision threshold inside the models directory
pub const THRESHOLD_FILE: &str = "threshold.txt";

/// Preprocessing and classifier fitted together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnPipeline {
    pub format_version: u32,
    pub family: ModelFamily,
    pub trained_at: DateTime<Utc>,
    pub preprocessor: Preprocessor,
    pub model: FittedModel,
}

impl ChurnPipeline {
    /// Fit preprocessing and the family's classifier on training features
    pub fn fit(
        family: ModelFamily,
        schema: &FeatureSchema,
        features: &DataFrame,
        target: &[u8],
        settings: &ModelSettings,
    ) -> Result<Self> {
        let preprocessor = Preprocessor::fit(features, schema)?;
        let x = preprocessor.transform(features)?;

        let mut model = FittedModel::build(family, settings)?;
        model
            .fit(&x, target)
            .with_context(|| format!("Failed to fit model '{}'", family))?;

        Ok(Self {
            format_version: FORMAT_VERSION,
            family,
            trained_at: Utc::now(),
            preprocessor,
            model,
        })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.preprocessor.schema
    }

    /// Positive-class probabilities for a feature frame.
    ///
    /// Schema mismatches surface as [`super::schema::SchemaError`] before any
    /// transform runs.
    pub fn predict_proba(&self, features: &DataFrame) -> Result<Vec<f64>> {
        let x = self.preprocessor.transform(features)?;
        Ok(self.model.predict_proba(&x)?.to_vec())
    }

    /// Write the artifact as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let json = serde_json::to_string(self).context("Failed to serialise pipeline")?;
        fs::write(path, json).with_context(|| format!("Failed to write pipeline: {}", path.display()))
    }

    /// Read an artifact, rejecting layouts this build does not understand
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline: {}", path.display()))?;
        let pipeline: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse pipeline: {}", path.display()))?;

        if pipeline.format_version != FORMAT_VERSION {
            anyhow::bail!(
                "Pipeline {} has format version {} (this build reads version {})",
                path.display(),
                pipeline.format_version,
                FORMAT_VERSION
            );
        }
        pipeline.schema().check_version()?;

        Ok(pipeline)
    }

    /// Load the saved pipeline of one family from the models directory
    pub fn load_family(models_dir: &Path, family: ModelFamily) -> Result<Self> {
        if !family.is_available() {
            anyhow::bail!("Model family '{}' is not available in this build", family);
        }
        let path = artifact_path(models_dir, family);
        if !path.exists() {
            anyhow::bail!(
                "Model artifact not found: {}. Run `churnkit train` first.",
                path.display()
            );
        }
        Self::load(&path)
    }
}

/// `<models_dir>/<family>.json`
pub fn artifact_path(models_dir: &Path, family: ModelFamily) -> PathBuf {
    models_dir.join(format!("{}.json", family.name()))
}

pub fn threshold_path(models_dir: &Path) -> PathBuf {
    models_dir.join(THRESHOLD_FILE)
}

/// Persist the decision threshold with four decimals
pub fn write_threshold(models_dir: &Path, threshold: f64) -> Result<PathBuf> {
    fs::create_dir_all(models_dir)
        .with_context(|| format!("Failed to create directory: {}", models_dir.display()))?;
    let path = threshold_path(models_dir);
    fs::write(&path, format!("{:.4}\n", threshold))
        .with_context(|| format!("Failed to write threshold: {}", path.display()))?;
    Ok(path)
}

/// Parse threshold text; `None` unless it is a finite value in [0, 1]
pub fn parse_threshold(text: &str) -> Option<f64> {
    text.trim()
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite() && (0.0..=1.0).contains(t))
}

/// Threshold loaded from the models directory
#[derive(Debug, Clone, PartialEq)]
pub struct StoredThreshold {
    pub value: f64,
    /// Why the stored value was rejected, if it was
    pub warning: Option<String>,
}

/// Read the tuned threshold, falling back to 0.5.
///
/// A missing file falls back silently; an unreadable or out-of-range value
/// falls back and carries a warning for the caller to report.
pub fn read_threshold(models_dir: &Path) -> StoredThreshold {
    let path = threshold_path(models_dir);
    let Ok(text) = fs::read_to_string(&path) else {
        return StoredThreshold {
            value: DEFAULT_THRESHOLD,
            warning: None,
        };
    };

    match parse_threshold(&text) {
        Some(value) => StoredThreshold { value, warning: None },
        None => StoredThreshold {
            value: DEFAULT_THRESHOLD,
            warning: Some(format!(
                "Ignoring invalid threshold '{}' in {}; using {}",
                text.trim(),
                path.display(),
                DEFAULT_THRESHOLD
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_threshold_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = write_threshold(dir.path(), 0.31234).unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), "0.3123\n");
        let stored = read_threshold(dir.path());
        assert_eq!(stored.value, 0.3123);
        assert!(stored.warning.is_none());
    }

    #[test]
    fn test_threshold_defaults() {
        let dir = TempDir::new().unwrap();
        let missing = read_threshold(dir.path());
        assert_eq!(missing.value, 0.5);
        assert!(missing.warning.is_none());

        for bad in ["abc", "1.7", "-0.2", "NaN", ""] {
            fs::write(threshold_path(dir.path()), bad).unwrap();
            let stored = read_threshold(dir.path());
            assert_eq!(stored.value, 0.5, "input {:?}", bad);
            let warning = stored.warning.unwrap();
            assert!(warning.contains(THRESHOLD_FILE), "input {:?}: {}", bad, warning);
        }
    }

    #[test]
    fn test_artifact_path() {
        let path = artifact_path(Path::new("models"), ModelFamily::RandomForest);
        assert_eq!(path, PathBuf::from("models/rf.json"));
    }

    #[test]
    fn test_pipeline_save_load() {
        let df = df! {
            "tenure" => [1.0f64, 2.0, 3.0, 10.0, 11.0, 12.0],
            "Contract" => ["a", "a", "b", "b", "a", "b"],
        }
        .unwrap();
        let y = [0u8, 0, 0, 1, 1, 1];
        let schema = FeatureSchema::infer(&df, "Churn");

        let pipeline =
            ChurnPipeline::fit(ModelFamily::LogReg, &schema, &df, &y, &ModelSettings::default()).unwrap();

        let dir = TempDir::new().unwrap();
        let path = artifact_path(dir.path(), ModelFamily::LogReg);
        pipeline.save(&path).unwrap();
        let loaded = ChurnPipeline::load(&path).unwrap();

        assert_eq!(loaded, pipeline);
        assert_eq!(loaded.predict_proba(&df).unwrap(), pipeline.predict_proba(&df).unwrap());
    }

    #[test]
    fn test_load_rejects_unknown_format_version() {
        let df = df! {
            "x" => [0.0f64, 1.0, 2.0, 3.0],
        }
        .unwrap();
        let schema = FeatureSchema::infer(&df, "Churn");
        let mut pipeline =
            ChurnPipeline::fit(ModelFamily::LogReg, &schema, &df, &[0, 0, 1, 1], &ModelSettings::default())
                .unwrap();
        pipeline.format_version = 42;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logreg.json");
        pipeline.save(&path).unwrap();
        assert!(ChurnPipeline::load(&path).is_err());
    }
}
