//! Seeded, stratified train/test split
//!
//! The held-out split is recomputed by every stage that needs it. Given the same
//! labels, proportion and seed the same rows are selected, so the evaluator
//! scores exactly the rows the trainer held out.

use anyhow::{Context, Result};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Default held-out proportion
pub const DEFAULT_TEST_SIZE: f64 = 0.25;

/// Default random seed
pub const DEFAULT_SEED: u64 = 42;

/// Row indices of a train/test split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Split row indices so both sides keep the class proportions of `labels`
pub fn stratified_split(labels: &[u8], test_size: f64, seed: u64) -> Result<SplitIndices> {
    let n = labels.len();
    if n == 0 {
        anyhow::bail!("Cannot split an empty dataset");
    }
    if !(test_size > 0.0 && test_size < 1.0) {
        anyhow::bail!("test_size must be between 0 and 1 (exclusive), got {}", test_size);
    }

    let n_test = ((n as f64) * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        anyhow::bail!(
            "Split of {} rows with test_size {} leaves an empty side",
            n,
            test_size
        );
    }

    // Group row indices per class, in class order (0 then 1)
    let mut classes: Vec<(u8, Vec<usize>)> = Vec::new();
    for class in [0u8, 1u8] {
        let rows: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == class)
            .map(|(i, _)| i)
            .collect();
        if !rows.is_empty() {
            classes.push((class, rows));
        }
    }

    let allocation = allocate_test_counts(&classes, n, n_test);

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n - n_test);
    let mut test = Vec::with_capacity(n_test);

    for ((_, rows), take) in classes.iter().zip(allocation) {
        let mut shuffled = rows.clone();
        shuffled.shuffle(&mut rng);
        test.extend_from_slice(&shuffled[..take]);
        train.extend_from_slice(&shuffled[take..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    if train.is_empty() || test.is_empty() {
        anyhow::bail!("Stratified split resulted in an empty train or test set");
    }

    Ok(SplitIndices { train, test })
}

/// Per-class test counts: proportional floor, remainder to the largest
/// fractional parts (lower class label first on ties).
fn allocate_test_counts(classes: &[(u8, Vec<usize>)], n: usize, n_test: usize) -> Vec<usize> {
    let exact: Vec<f64> = classes
        .iter()
        .map(|(_, rows)| rows.len() as f64 * n_test as f64 / n as f64)
        .collect();

    let mut counts: Vec<usize> = exact.iter().map(|e| e.floor() as usize).collect();
    let mut remaining = n_test - counts.iter().sum::<usize>();

    let mut order: Vec<usize> = (0..classes.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - exact[a].floor();
        let fb = exact[b] - exact[b].floor();
        fb.partial_cmp(&fa).unwrap_or(std::cmp::Ordering::Equal)
    });

    for idx in order.into_iter().cycle() {
        if remaining == 0 {
            break;
        }
        if counts[idx] < classes[idx].1.len() {
            counts[idx] += 1;
            remaining -= 1;
        }
    }

    counts
}

/// Select rows of a frame by index, in the given order
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    df.take(&idx).context("Failed to select split rows")
}

/// Select labels by index, in the given order
pub fn take_labels(labels: &[u8], indices: &[usize]) -> Vec<u8> {
    indices.iter().map(|&i| labels[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels_with_rate(n: usize, positives: usize) -> Vec<u8> {
        (0..n).map(|i| u8::from(i < positives)).collect()
    }

    #[test]
    fn test_split_sizes_and_stratification() {
        let labels = labels_with_rate(1000, 200);
        let split = stratified_split(&labels, 0.25, 42).unwrap();

        assert_eq!(split.test.len(), 250);
        assert_eq!(split.train.len(), 750);

        let test_pos = split.test.iter().filter(|&&i| labels[i] == 1).count();
        assert_eq!(test_pos, 50);
    }

    #[test]
    fn test_split_is_partition() {
        let labels = labels_with_rate(101, 37);
        let split = stratified_split(&labels, 0.25, 7).unwrap();

        let mut all: Vec<usize> = split.train.iter().chain(split.test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..101).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_reproducible_with_seed() {
        let labels = labels_with_rate(300, 60);
        let a = stratified_split(&labels, 0.25, 42).unwrap();
        let b = stratified_split(&labels, 0.25, 42).unwrap();
        let c = stratified_split(&labels, 0.25, 43).unwrap();

        assert_eq!(a, b);
        assert_ne!(a.test, c.test);
    }

    #[test]
    fn test_split_rejects_bad_inputs() {
        assert!(stratified_split(&[], 0.25, 42).is_err());
        assert!(stratified_split(&[0, 1, 0, 1], 0.0, 42).is_err());
        assert!(stratified_split(&[0, 1, 0, 1], 1.0, 42).is_err());
    }

    #[test]
    fn test_take_rows() {
        let df = df! { "a" => [10i64, 20, 30, 40] }.unwrap();
        let picked = take_rows(&df, &[3, 1]).unwrap();
        let values: Vec<Option<i64>> = picked.column("a").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(40), Some(20)]);
    }
}
