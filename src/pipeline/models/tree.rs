//! Binary decision trees shared by the forest and boosting backends
//!
//! Two growth criteria are supported: Gini impurity over 0/1 labels (leaf value
//! is the positive fraction) and second-order gradient statistics for boosting
//! (leaf value is the Newton step `-G / (H + lambda)`).

use ndarray::{Array2, ArrayView1};
use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Minimum improvement for a split to be accepted
const MIN_GAIN: f64 = 1e-12;

/// Tree node; children are indices into [`Tree::nodes`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree stored as a flat node list, root first.
///
/// The flat layout keeps persisted trees free of deep nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// Leaf value reached by one row
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], idx: usize) -> usize {
            match &nodes[idx] {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }
}

/// Growth limits
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    /// Maximum depth (None = grow until pure)
    pub max_depth: Option<usize>,
    /// Minimum rows per leaf
    pub min_samples_leaf: usize,
    /// Features drawn per split (None = all)
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

/// Rows of a node sorted by one feature
fn sorted_by_feature(x: &Array2<f64>, rows: &[usize], feature: usize) -> Vec<usize> {
    let mut sorted = rows.to_vec();
    sorted.sort_by(|&a, &b| {
        x[[a, feature]]
            .partial_cmp(&x[[b, feature]])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    sorted
}

/// Draw the candidate features for one split
fn candidate_features<R: Rng>(n_features: usize, max_features: Option<usize>, rng: &mut R) -> Vec<usize> {
    match max_features {
        Some(k) if k < n_features => {
            let mut picked = sample(rng, n_features, k.max(1)).into_vec();
            picked.sort_unstable();
            picked
        }
        _ => (0..n_features).collect(),
    }
}

fn partition(x: &Array2<f64>, rows: &[usize], feature: usize, threshold: f64) -> (Vec<usize>, Vec<usize>) {
    rows.iter().partition(|&&r| x[[r, feature]] <= threshold)
}

fn gini(positives: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    let p = positives / n;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

/// Grow a classification tree with Gini impurity.
///
/// `rows` may contain repeated indices (bootstrap samples).
pub fn grow_gini<R: Rng>(x: &Array2<f64>, y: &[u8], rows: &[usize], params: &TreeParams, rng: &mut R) -> Tree {
    let mut nodes = Vec::new();
    gini_node(x, y, rows, params, 0, rng, &mut nodes);
    Tree { nodes }
}

fn gini_node<R: Rng>(
    x: &Array2<f64>,
    y: &[u8],
    rows: &[usize],
    params: &TreeParams,
    depth: usize,
    rng: &mut R,
    nodes: &mut Vec<TreeNode>,
) -> usize {
    let n = rows.len();
    let positives = rows.iter().filter(|&&r| y[r] == 1).count();
    let value = if n == 0 { 0.0 } else { positives as f64 / n as f64 };

    let should_stop = positives == 0
        || positives == n
        || n < 2 * params.min_samples_leaf.max(1)
        || params.max_depth.is_some_and(|d| depth >= d);
    let idx = nodes.len();
    nodes.push(TreeNode::Leaf { value });
    if should_stop {
        return idx;
    }

    let parent = gini(positives as f64, n as f64);
    let mut best: Option<(usize, f64, f64)> = None;

    for feature in candidate_features(x.ncols(), params.max_features, rng) {
        let sorted = sorted_by_feature(x, rows, feature);
        let mut left_pos = 0usize;

        for i in 0..n - 1 {
            left_pos += usize::from(y[sorted[i]] == 1);
            let current = x[[sorted[i], feature]];
            let next = x[[sorted[i + 1], feature]];
            if current >= next {
                continue;
            }

            let left_n = i + 1;
            let right_n = n - left_n;
            if left_n < params.min_samples_leaf || right_n < params.min_samples_leaf {
                continue;
            }

            let weighted = (left_n as f64 * gini(left_pos as f64, left_n as f64)
                + right_n as f64 * gini((positives - left_pos) as f64, right_n as f64))
                / n as f64;
            let gain = parent - weighted;

            if gain > MIN_GAIN && best.map_or(true, |(_, _, g)| gain > g + MIN_GAIN) {
                best = Some((feature, (current + next) / 2.0, gain));
            }
        }
    }

    let Some((feature, threshold, _)) = best else {
        return idx;
    };

    let (left_rows, right_rows) = partition(x, rows, feature, threshold);
    if left_rows.is_empty() || right_rows.is_empty() {
        return idx;
    }

    let left = gini_node(x, y, &left_rows, params, depth + 1, rng, nodes);
    let right = gini_node(x, y, &right_rows, params, depth + 1, rng, nodes);
    nodes[idx] = TreeNode::Split {
        feature,
        threshold,
        left,
        right,
    };
    idx
}

/// Gradient statistics for boosting trees
pub struct GradientStats<'a> {
    pub grad: &'a [f64],
    pub hess: &'a [f64],
    /// L2 penalty on leaf values
    pub lambda: f64,
    /// Minimum hessian sum per child
    pub min_child_weight: f64,
    /// Minimum rows per child
    pub min_samples_leaf: usize,
}

impl GradientStats<'_> {
    fn totals(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter()
            .fold((0.0, 0.0), |(g, h), &r| (g + self.grad[r], h + self.hess[r]))
    }

    /// Newton step `-G / (H + lambda)` over `rows`
    fn leaf_value(&self, rows: &[usize]) -> f64 {
        let (g, h) = self.totals(rows);
        -g / (h + self.lambda)
    }
}

/// Best split of one node on second-order statistics
#[derive(Debug, Clone, Copy)]
struct NewtonSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

fn best_newton_split(
    x: &Array2<f64>,
    stats: &GradientStats<'_>,
    rows: &[usize],
    features: &[usize],
) -> Option<NewtonSplit> {
    let min_leaf = stats.min_samples_leaf.max(1);
    if rows.len() < 2 * min_leaf {
        return None;
    }

    let (g_total, h_total) = stats.totals(rows);
    let parent_score = g_total * g_total / (h_total + stats.lambda);
    let mut best: Option<NewtonSplit> = None;

    for &feature in features {
        let sorted = sorted_by_feature(x, rows, feature);
        let mut g_left = 0.0;
        let mut h_left = 0.0;

        for i in 0..sorted.len() - 1 {
            g_left += stats.grad[sorted[i]];
            h_left += stats.hess[sorted[i]];
            let current = x[[sorted[i], feature]];
            let next = x[[sorted[i + 1], feature]];
            if current >= next {
                continue;
            }
            if i + 1 < min_leaf || sorted.len() - i - 1 < min_leaf {
                continue;
            }

            let g_right = g_total - g_left;
            let h_right = h_total - h_left;
            if h_left < stats.min_child_weight || h_right < stats.min_child_weight {
                continue;
            }

            let gain = g_left * g_left / (h_left + stats.lambda)
                + g_right * g_right / (h_right + stats.lambda)
                - parent_score;

            if gain > MIN_GAIN && best.map_or(true, |b| gain > b.gain + MIN_GAIN) {
                best = Some(NewtonSplit {
                    feature,
                    threshold: (current + next) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}

/// Grow a regression tree on gradient/hessian statistics, level by level down
/// to `max_depth`.
///
/// Only the columns in `features` are considered for splits.
pub fn grow_newton(
    x: &Array2<f64>,
    stats: &GradientStats<'_>,
    rows: &[usize],
    features: &[usize],
    max_depth: usize,
) -> Tree {
    let mut nodes = Vec::new();
    newton_node(x, stats, rows, features, max_depth, 0, &mut nodes);
    Tree { nodes }
}

fn newton_node(
    x: &Array2<f64>,
    stats: &GradientStats<'_>,
    rows: &[usize],
    features: &[usize],
    max_depth: usize,
    depth: usize,
    nodes: &mut Vec<TreeNode>,
) -> usize {
    let idx = nodes.len();
    nodes.push(TreeNode::Leaf {
        value: stats.leaf_value(rows),
    });
    if depth >= max_depth {
        return idx;
    }

    let Some(split) = best_newton_split(x, stats, rows, features) else {
        return idx;
    };

    let (left_rows, right_rows) = partition(x, rows, split.feature, split.threshold);
    if left_rows.is_empty() || right_rows.is_empty() {
        return idx;
    }

    let left = newton_node(x, stats, &left_rows, features, max_depth, depth + 1, nodes);
    let right = newton_node(x, stats, &right_rows, features, max_depth, depth + 1, nodes);
    nodes[idx] = TreeNode::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
    };
    idx
}

/// Grow a regression tree best-first: the open leaf with the largest gain is
/// split next, until the tree has `max_leaves` leaves or no leaf can split.
pub fn grow_newton_leafwise(
    x: &Array2<f64>,
    stats: &GradientStats<'_>,
    rows: &[usize],
    features: &[usize],
    max_leaves: usize,
) -> Tree {
    struct OpenLeaf {
        node: usize,
        rows: Vec<usize>,
        split: Option<NewtonSplit>,
    }

    let mut nodes = vec![TreeNode::Leaf {
        value: stats.leaf_value(rows),
    }];
    let mut open = vec![OpenLeaf {
        node: 0,
        rows: rows.to_vec(),
        split: best_newton_split(x, stats, rows, features),
    }];
    let mut n_leaves = 1;

    while n_leaves < max_leaves {
        // Earliest opened leaf wins ties
        let mut best: Option<(usize, f64)> = None;
        for (pos, leaf) in open.iter().enumerate() {
            if let Some(split) = &leaf.split {
                if best.map_or(true, |(_, gain)| split.gain > gain) {
                    best = Some((pos, split.gain));
                }
            }
        }
        let Some((pos, _)) = best else {
            break;
        };

        let leaf = open.remove(pos);
        let Some(split) = leaf.split else {
            break;
        };
        let (left_rows, right_rows) = partition(x, &leaf.rows, split.feature, split.threshold);

        let left = nodes.len();
        nodes.push(TreeNode::Leaf {
            value: stats.leaf_value(&left_rows),
        });
        let right = nodes.len();
        nodes.push(TreeNode::Leaf {
            value: stats.leaf_value(&right_rows),
        });
        nodes[leaf.node] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        n_leaves += 1;

        for (node, child_rows) in [(left, left_rows), (right, right_rows)] {
            let split = best_newton_split(x, stats, &child_rows, features);
            open.push(OpenLeaf {
                node,
                rows: child_rows,
                split,
            });
        }
    }

    Tree { nodes }
}
