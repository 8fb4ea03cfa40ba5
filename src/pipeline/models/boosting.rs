//! Gradient-boosted trees with logistic loss

use anyhow::Result;
use ndarray::{Array1, Array2};
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::tree::{grow_newton, grow_newton_leafwise, GradientStats, Tree};
use super::{require_both_classes, sigmoid, Classifier};

/// How each boosting round grows its tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeGrowth {
    /// Split every node level by level down to a fixed depth
    DepthWise { max_depth: usize },
    /// Split the highest-gain leaf first until the leaf budget is spent
    LeafWise { max_leaves: usize },
}

/// Boosted ensemble of Newton regression trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub growth: TreeGrowth,
    /// Fraction of rows drawn per round
    pub subsample: f64,
    /// Fraction of columns drawn per tree
    pub colsample: f64,
    /// L2 penalty on leaf values
    pub lambda: f64,
    pub min_child_weight: f64,
    pub min_samples_leaf: usize,
    pub random_state: u64,
    /// Initial log-odds
    base_score: f64,
    n_features: usize,
    trees: Vec<Tree>,
}

impl GradientBoosting {
    /// Depth-limited trees with XGBoost-style defaults
    pub fn depth_wise(n_estimators: usize, random_state: u64) -> Self {
        Self {
            n_estimators,
            learning_rate: 0.05,
            growth: TreeGrowth::DepthWise { max_depth: 5 },
            subsample: 0.9,
            colsample: 0.9,
            lambda: 1.0,
            min_child_weight: 1.0,
            min_samples_leaf: 1,
            random_state,
            base_score: 0.0,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    /// Leaf-budgeted trees with LightGBM-style defaults (31 leaves, 20 rows
    /// per leaf, no row bagging)
    pub fn leaf_wise(n_estimators: usize, random_state: u64) -> Self {
        Self {
            n_estimators,
            learning_rate: 0.05,
            growth: TreeGrowth::LeafWise { max_leaves: 31 },
            subsample: 1.0,
            colsample: 0.9,
            lambda: 0.0,
            min_child_weight: 1e-3,
            min_samples_leaf: 20,
            random_state,
            base_score: 0.0,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn raw_scores(&self, x: &Array2<f64>) -> Array1<f64> {
        let mut scores = Array1::from_elem(x.nrows(), self.base_score);
        for tree in &self.trees {
            for (i, row) in x.outer_iter().enumerate() {
                scores[i] += self.learning_rate * tree.predict_row(row);
            }
        }
        scores
    }
}

/// Draw `ceil(fraction * n)` sorted indices out of `0..n`, at least one
fn draw_fraction(rng: &mut ChaCha8Rng, n: usize, fraction: f64) -> Vec<usize> {
    let k = ((n as f64 * fraction).ceil() as usize).clamp(1, n);
    if k == n {
        return (0..n).collect();
    }
    let mut picked = sample(rng, n, k).into_vec();
    picked.sort_unstable();
    picked
}

impl Classifier for GradientBoosting {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        require_both_classes(x, y)?;
        if !(self.subsample > 0.0 && self.subsample <= 1.0) || !(self.colsample > 0.0 && self.colsample <= 1.0) {
            anyhow::bail!("Subsample ratios must be in (0, 1]");
        }
        if x.ncols() == 0 {
            anyhow::bail!("Gradient boosting needs at least one feature");
        }

        let (n, p) = x.dim();
        let positives = y.iter().filter(|&&v| v == 1).count() as f64;
        let rate = positives / n as f64;
        self.base_score = (rate / (1.0 - rate)).ln();
        self.n_features = p;
        self.trees = Vec::with_capacity(self.n_estimators);

        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let mut scores = vec![self.base_score; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];

        for _ in 0..self.n_estimators {
            for i in 0..n {
                let prob = sigmoid(scores[i]);
                grad[i] = prob - f64::from(y[i]);
                hess[i] = (prob * (1.0 - prob)).max(1e-16);
            }

            let rows = draw_fraction(&mut rng, n, self.subsample);
            let features = draw_fraction(&mut rng, p, self.colsample);
            let stats = GradientStats {
                grad: &grad,
                hess: &hess,
                lambda: self.lambda,
                min_child_weight: self.min_child_weight,
                min_samples_leaf: self.min_samples_leaf,
            };

            let tree = match self.growth {
                TreeGrowth::DepthWise { max_depth } => grow_newton(x, &stats, &rows, &features, max_depth),
                TreeGrowth::LeafWise { max_leaves } => {
                    grow_newton_leafwise(x, &stats, &rows, &features, max_leaves)
                }
            };
            for (i, row) in x.outer_iter().enumerate() {
                scores[i] += self.learning_rate * tree.predict_row(row);
            }
            self.trees.push(tree);
        }

        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.n_features == 0 {
            anyhow::bail!("Gradient boosting model is not fitted");
        }
        if x.ncols() != self.n_features {
            anyhow::bail!(
                "Gradient boosting expects {} features, got {}",
                self.n_features,
                x.ncols()
            );
        }
        Ok(self.raw_scores(x).mapv(sigmoid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_data() -> (Array2<f64>, Vec<u8>) {
        let n = 80;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { i as f64 } else { (i % 5) as f64 });
        let y = (0..n).map(|i| u8::from(i >= 50)).collect();
        (x, y)
    }

    #[test]
    fn test_boosting_learns_threshold() {
        let (x, y) = threshold_data();
        let mut model = GradientBoosting::depth_wise(50, 42);
        model.learning_rate = 0.3;
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba[10] < 0.5);
        assert!(proba[70] > 0.5);
        assert_eq!(model.n_trees(), 50);
    }

    #[test]
    fn test_zero_rounds_predicts_base_rate() {
        let (x, y) = threshold_data();
        let mut model = GradientBoosting::depth_wise(0, 42);
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!((proba[0] - 30.0 / 80.0).abs() < 1e-12);
    }

    #[test]
    fn test_boosting_is_deterministic() {
        let (x, y) = threshold_data();
        let builders: [fn(usize, u64) -> GradientBoosting; 2] =
            [GradientBoosting::depth_wise, GradientBoosting::leaf_wise];
        for build in builders {
            let mut a = build(20, 3);
            let mut b = build(20, 3);
            a.fit(&x, &y).unwrap();
            b.fit(&x, &y).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_leaf_wise_learns_threshold() {
        let (x, y) = threshold_data();
        let mut model = GradientBoosting::leaf_wise(60, 42);
        model.learning_rate = 0.3;
        model.fit(&x, &y).unwrap();

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba[10] < 0.5);
        assert!(proba[70] > 0.5);
        assert!(model.trees.iter().all(|t| t.n_leaves() <= 31));
    }

    #[test]
    fn test_growth_strategy_survives_serialisation() {
        let (x, y) = threshold_data();
        let mut model = GradientBoosting::leaf_wise(5, 1);
        model.fit(&x, &y).unwrap();

        let json = serde_json::to_string(&model).unwrap();
        assert!(json.contains("\"kind\":\"leaf_wise\""));
        let reloaded: GradientBoosting = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded, model);
    }
}
