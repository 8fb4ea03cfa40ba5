//! Model families trained on the preprocessed matrix

pub mod forest;
pub mod logistic;
pub mod tree;

#[cfg(any(feature = "xgb", feature = "lgbm"))]
pub mod boosting;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

pub use forest::RandomForest;
pub use logistic::LogisticRegression;

#[cfg(any(feature = "xgb", feature = "lgbm"))]
pub use boosting::{GradientBoosting, TreeGrowth};

/// Binary probabilistic classifier
pub trait Classifier {
    /// Fit on a feature matrix and 0/1 labels
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()>;

    /// Probability of the positive class for each row
    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Numerically stable logistic function
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Shared fit preconditions: matching lengths, non-empty, both classes present
pub fn require_both_classes(x: &Array2<f64>, y: &[u8]) -> Result<()> {
    if x.nrows() != y.len() {
        anyhow::bail!(
            "Feature matrix has {} rows but {} labels were given",
            x.nrows(),
            y.len()
        );
    }
    if y.is_empty() {
        anyhow::bail!("Cannot fit a model on zero rows");
    }
    if let Some(bad) = y.iter().find(|&&v| v > 1) {
        anyhow::bail!("Labels must be 0 or 1, found {}", bad);
    }
    let positives = y.iter().filter(|&&v| v == 1).count();
    if positives == 0 || positives == y.len() {
        anyhow::bail!("Training labels contain a single class; both 0 and 1 are required");
    }
    Ok(())
}

/// Model family identifier, also the artifact file stem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFamily {
    #[serde(rename = "logreg")]
    LogReg,
    #[serde(rename = "rf")]
    RandomForest,
    /// Depth-wise gradient boosting
    #[serde(rename = "xgb")]
    Xgb,
    /// Leaf-wise gradient boosting
    #[serde(rename = "lgbm")]
    Lgbm,
}

impl ModelFamily {
    /// Every family in training order
    pub const ALL: [ModelFamily; 4] = [
        ModelFamily::LogReg,
        ModelFamily::RandomForest,
        ModelFamily::Xgb,
        ModelFamily::Lgbm,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelFamily::LogReg => "logreg",
            ModelFamily::RandomForest => "rf",
            ModelFamily::Xgb => "xgb",
            ModelFamily::Lgbm => "lgbm",
        }
    }

    /// Whether this build includes the family's backend
    pub fn is_available(&self) -> bool {
        match self {
            ModelFamily::Xgb => cfg!(feature = "xgb"),
            ModelFamily::Lgbm => cfg!(feature = "lgbm"),
            _ => true,
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ModelFamily {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "logreg" => Ok(ModelFamily::LogReg),
            "rf" => Ok(ModelFamily::RandomForest),
            "xgb" => Ok(ModelFamily::Xgb),
            "lgbm" => Ok(ModelFamily::Lgbm),
            other => anyhow::bail!("Unknown model family '{}' (expected logreg, rf, xgb or lgbm)", other),
        }
    }
}

/// Hyperparameters for the families that are not fixed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelSettings {
    pub rf_trees: usize,
    pub xgb_rounds: usize,
    pub lgbm_rounds: usize,
    pub logreg_c: f64,
    pub seed: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            rf_trees: 400,
            xgb_rounds: 500,
            lgbm_rounds: 600,
            logreg_c: 1.0,
            seed: 42,
        }
    }
}

/// A fitted (or ready to fit) model of any family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "params")]
pub enum FittedModel {
    #[serde(rename = "logreg")]
    LogReg(LogisticRegression),
    #[serde(rename = "rf")]
    RandomForest(RandomForest),
    #[cfg(feature = "xgb")]
    #[serde(rename = "xgb")]
    Xgb(GradientBoosting),
    #[cfg(feature = "lgbm")]
    #[serde(rename = "lgbm")]
    Lgbm(GradientBoosting),
}

impl FittedModel {
    /// Unfitted model for a family
    pub fn build(family: ModelFamily, settings: &ModelSettings) -> Result<Self> {
        match family {
            ModelFamily::LogReg => Ok(FittedModel::LogReg(LogisticRegression::new(settings.logreg_c))),
            ModelFamily::RandomForest => Ok(FittedModel::RandomForest(RandomForest::new(
                settings.rf_trees,
                settings.seed,
            ))),
            #[cfg(feature = "xgb")]
            ModelFamily::Xgb => Ok(FittedModel::Xgb(GradientBoosting::depth_wise(
                settings.xgb_rounds,
                settings.seed,
            ))),
            #[cfg(feature = "lgbm")]
            ModelFamily::Lgbm => Ok(FittedModel::Lgbm(GradientBoosting::leaf_wise(
                settings.lgbm_rounds,
                settings.seed,
            ))),
            #[allow(unreachable_patterns)]
            other => anyhow::bail!("Model family '{}' is not available in this build", other),
        }
    }

    pub fn family(&self) -> ModelFamily {
        match self {
            FittedModel::LogReg(_) => ModelFamily::LogReg,
            FittedModel::RandomForest(_) => ModelFamily::RandomForest,
            #[cfg(feature = "xgb")]
            FittedModel::Xgb(_) => ModelFamily::Xgb,
            #[cfg(feature = "lgbm")]
            FittedModel::Lgbm(_) => ModelFamily::Lgbm,
        }
    }

    /// The linear model, if this is one
    pub fn linear(&self) -> Option<&LogisticRegression> {
        match self {
            FittedModel::LogReg(model) => Some(model),
            _ => None,
        }
    }
}

impl Classifier for FittedModel {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        match self {
            FittedModel::LogReg(model) => model.fit(x, y),
            FittedModel::RandomForest(model) => model.fit(x, y),
            #[cfg(feature = "xgb")]
            FittedModel::Xgb(model) => model.fit(x, y),
            #[cfg(feature = "lgbm")]
            FittedModel::Lgbm(model) => model.fit(x, y),
        }
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            FittedModel::LogReg(model) => model.predict_proba(x),
            FittedModel::RandomForest(model) => model.predict_proba(x),
            #[cfg(feature = "xgb")]
            FittedModel::Xgb(model) => model.predict_proba(x),
            #[cfg(feature = "lgbm")]
            FittedModel::Lgbm(model) => model.predict_proba(x),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(-800.0).is_finite());
    }

    #[test]
    fn test_require_both_classes() {
        let x = array![[0.0], [1.0]];
        assert!(require_both_classes(&x, &[0, 1]).is_ok());
        assert!(require_both_classes(&x, &[0, 0]).is_err());
        assert!(require_both_classes(&x, &[0]).is_err());
        assert!(require_both_classes(&x, &[0, 2]).is_err());
    }

    #[test]
    fn test_family_names_round_trip() {
        for family in ModelFamily::ALL {
            assert_eq!(family.name().parse::<ModelFamily>().unwrap(), family);
        }
        assert!("svm".parse::<ModelFamily>().is_err());
    }

    #[test]
    fn test_build_matches_family() {
        let settings = ModelSettings::default();
        let model = FittedModel::build(ModelFamily::LogReg, &settings).unwrap();
        assert_eq!(model.family(), ModelFamily::LogReg);
        assert!(model.linear().is_some());

        let model = FittedModel::build(ModelFamily::RandomForest, &settings).unwrap();
        assert!(model.linear().is_none());
    }

    #[test]
    fn test_boosting_availability_follows_features() {
        for family in [ModelFamily::Xgb, ModelFamily::Lgbm] {
            let built = FittedModel::build(family, &ModelSettings::default());
            assert_eq!(built.is_ok(), family.is_available(), "{}", family);
            if let Ok(model) = built {
                assert_eq!(model.family(), family);
            }
        }
    }

    #[test]
    fn test_family_order_and_names() {
        let names: Vec<&str> = ModelFamily::ALL.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["logreg", "rf", "xgb", "lgbm"]);
        assert!("gbt".parse::<ModelFamily>().is_err());
    }
}
