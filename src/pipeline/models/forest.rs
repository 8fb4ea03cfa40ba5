//! Random forest of Gini trees

use anyhow::Result;
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{grow_gini, Tree, TreeParams};
use super::{require_both_classes, Classifier};

/// Random forest classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub bootstrap: bool,
    pub random_state: u64,
    n_features: usize,
    trees: Vec<Tree>,
}

impl Default for RandomForest {
    fn default() -> Self {
        Self::new(400, 42)
    }
}

impl RandomForest {
    pub fn new(n_estimators: usize, random_state: u64) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            min_samples_leaf: 1,
            bootstrap: true,
            random_state,
            n_features: 0,
            trees: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    /// Square root of the feature count, at least one
    fn max_features(n_features: usize) -> usize {
        ((n_features as f64).sqrt() as usize).max(1)
    }
}

impl Classifier for RandomForest {
    fn fit(&mut self, x: &Array2<f64>, y: &[u8]) -> Result<()> {
        require_both_classes(x, y)?;
        if self.n_estimators == 0 {
            anyhow::bail!("Random forest needs at least one tree");
        }

        let n = x.nrows();
        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            max_features: Some(Self::max_features(x.ncols())),
        };

        // Each tree owns an RNG derived from the forest seed, so the result
        // does not depend on thread scheduling.
        let trees: Vec<Tree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(self.random_state.wrapping_add(t as u64));
                let rows: Vec<usize> = if self.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                grow_gini(x, y, &rows, &params, &mut rng)
            })
            .collect();

        self.n_features = x.ncols();
        self.trees = trees;
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            anyhow::bail!("Random forest is not fitted");
        }
        if x.ncols() != self.n_features {
            anyhow::bail!(
                "Random forest expects {} features, got {}",
                self.n_features,
                x.ncols()
            );
        }

        let n_trees = self.trees.len() as f64;
        let proba: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees
            })
            .collect();

        Ok(Array1::from_vec(proba))
    }
}
