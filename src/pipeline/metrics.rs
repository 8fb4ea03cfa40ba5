//! Binary classification metrics

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Epsilon in the F1 denominator used for threshold selection
pub const F1_EPSILON: f64 = 1e-9;

/// Default decision threshold
pub const DEFAULT_THRESHOLD: f64 = 0.5;

fn check_lengths(y_true: &[u8], other: usize) -> Result<()> {
    if y_true.len() != other {
        anyhow::bail!(
            "Label and prediction lengths differ ({} vs {})",
            y_true.len(),
            other
        );
    }
    if y_true.is_empty() {
        anyhow::bail!("Cannot compute metrics on zero rows");
    }
    Ok(())
}

/// Fraction of predictions equal to the labels
pub fn accuracy(y_true: &[u8], y_pred: &[u8]) -> Result<f64> {
    check_lengths(y_true, y_pred.len())?;
    let correct = y_true.iter().zip(y_pred).filter(|(a, b)| a == b).count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// Area under the ROC curve from the Mann-Whitney rank statistic.
///
/// Tied scores receive their average rank. Fails when only one class is
/// present.
pub fn roc_auc(y_true: &[u8], scores: &[f64]) -> Result<f64> {
    check_lengths(y_true, scores.len())?;

    let n_pos = y_true.iter().filter(|&&v| v == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        anyhow::bail!("ROC-AUC is undefined when only one class is present in the labels");
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut rank_sum_pos = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based; the tie group i..=j shares their mean
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            if y_true[idx] == 1 {
                rank_sum_pos += avg_rank;
            }
        }
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((rank_sum_pos - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// `[[tn, fp], [fn, tp]]`
pub fn confusion_matrix(y_true: &[u8], y_pred: &[u8]) -> Result<[[usize; 2]; 2]> {
    check_lengths(y_true, y_pred.len())?;
    let mut matrix = [[0usize; 2]; 2];
    for (&t, &p) in y_true.iter().zip(y_pred) {
        matrix[usize::from(t == 1)][usize::from(p == 1)] += 1;
    }
    Ok(matrix)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Precision, recall and F1 for the positive class; zero division yields 0
pub fn precision_recall_f1(y_true: &[u8], y_pred: &[u8]) -> Result<(f64, f64, f64)> {
    let [[_, fp], [fn_, tp]] = confusion_matrix(y_true, y_pred)?;
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    Ok((precision, recall, f1))
}

/// Hard predictions: `1` where `p >= threshold`
pub fn threshold_predictions(proba: &[f64], threshold: f64) -> Vec<u8> {
    proba.iter().map(|&p| u8::from(p >= threshold)).collect()
}

/// Precision/recall pairs over every distinct score.
///
/// `thresholds` are ascending; `precision[i]`/`recall[i]` describe the
/// decision `score >= thresholds[i]`. The curve ends with one extra point
/// (precision 1, recall 0) that has no threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct PrecisionRecallCurve {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub thresholds: Vec<f64>,
}

pub fn precision_recall_curve(y_true: &[u8], scores: &[f64]) -> Result<PrecisionRecallCurve> {
    check_lengths(y_true, scores.len())?;

    let total_pos = y_true.iter().filter(|&&v| v == 1).count();

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    // Walk from the highest score down, emitting one point per distinct score
    let mut precision = Vec::new();
    let mut recall = Vec::new();
    let mut thresholds = Vec::new();
    let mut tp = 0usize;
    let mut fp = 0usize;

    for (k, &idx) in order.iter().enumerate() {
        if y_true[idx] == 1 {
            tp += 1;
        } else {
            fp += 1;
        }
        let is_last_of_group = order
            .get(k + 1)
            .map_or(true, |&next| scores[next] != scores[idx]);
        if is_last_of_group {
            precision.push(ratio(tp, tp + fp));
            recall.push(ratio(tp, total_pos));
            thresholds.push(scores[idx]);
        }
    }

    precision.reverse();
    recall.reverse();
    thresholds.reverse();
    precision.push(1.0);
    recall.push(0.0);

    Ok(PrecisionRecallCurve {
        precision,
        recall,
        thresholds,
    })
}

/// Result of a threshold search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdChoice {
    pub threshold: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Threshold that maximises F1 along the precision/recall curve.
///
/// Ties keep the first point in ascending-threshold order. When the best point
/// is the terminal one (which has no threshold) the default 0.5 is returned.
pub fn best_f1_threshold(curve: &PrecisionRecallCurve) -> ThresholdChoice {
    let mut best = 0;
    let mut best_f1 = f64::NEG_INFINITY;
    for (i, (&p, &r)) in curve.precision.iter().zip(&curve.recall).enumerate() {
        let f1 = 2.0 * p * r / (p + r + F1_EPSILON);
        if f1 > best_f1 {
            best_f1 = f1;
            best = i;
        }
    }

    ThresholdChoice {
        threshold: curve.thresholds.get(best).copied().unwrap_or(DEFAULT_THRESHOLD),
        precision: curve.precision.get(best).copied().unwrap_or(1.0),
        recall: curve.recall.get(best).copied().unwrap_or(0.0),
        f1: best_f1.max(0.0),
    }
}

/// Headline metrics of one model on one split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub accuracy: f64,
    pub roc_auc: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion: [[usize; 2]; 2],
}

impl ModelScore {
    /// Score probabilities against labels at a decision threshold
    pub fn compute(y_true: &[u8], proba: &[f64], threshold: f64) -> Result<Self> {
        let y_pred = threshold_predictions(proba, threshold);
        let (precision, recall, f1) = precision_recall_f1(y_true, &y_pred)?;
        Ok(Self {
            accuracy: accuracy(y_true, &y_pred)?,
            roc_auc: roc_auc(y_true, proba)?,
            precision,
            recall,
            f1,
            confusion: confusion_matrix(y_true, &y_pred)?,
        })
    }
}
