//! Hold-out evaluation metrics

use crate::errors::{CoreError, Result};
use crate::prediction::decide;

fn check_lengths(expected: &[f64], actual: &[f64]) -> Result<()> {
    if expected.is_empty() {
        return Err(CoreError::EmptyDataset);
    }
    if expected.len() != actual.len() {
        return Err(CoreError::DimensionMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }
    Ok(())
}

/// Share of rows where the thresholded probability matches the 0/1 label.
pub fn accuracy(labels: &[f64], probabilities: &[f64], threshold: f64) -> Result<f64> {
    check_lengths(labels, probabilities)?;
    let hits = labels
        .iter()
        .zip(probabilities)
        .filter(|(&label, &p)| decide(p, threshold) == (label == 1.0))
        .count();
    Ok(hits as f64 / labels.len() as f64)
}

/// Area under the ROC curve via the rank-sum statistic; tied scores share
/// their average rank.
pub fn roc_auc(labels: &[f64], scores: &[f64]) -> Result<f64> {
    check_lengths(labels, scores)?;

    let positives = labels.iter().filter(|&&l| l == 1.0).count();
    let negatives = labels.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(CoreError::InvalidTarget(
            "AUC needs both classes".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut ranks = vec![0.0; scores.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // 1-based average rank of the tie block [start, end)
        let rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = rank;
        }
        start = end;
    }

    let positive_rank_sum: f64 = labels
        .iter()
        .zip(&ranks)
        .filter(|(&l, _)| l == 1.0)
        .map(|(_, &r)| r)
        .sum();
    let p = positives as f64;
    let n = negatives as f64;
    Ok((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

/// Root mean squared error.
pub fn rmse(targets: &[f64], predictions: &[f64]) -> Result<f64> {
    check_lengths(targets, predictions)?;
    let mse = targets
        .iter()
        .zip(predictions)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / targets.len() as f64;
    Ok(mse.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_ranking_has_unit_auc() {
        let labels = [0.0, 0.0, 1.0, 1.0];
        let scores = [0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&labels, &scores).unwrap(), 1.0);
    }

    #[test]
    fn ties_count_half() {
        let labels = [0.0, 1.0];
        let scores = [0.5, 0.5];
        assert_eq!(roc_auc(&labels, &scores).unwrap(), 0.5);
    }

    #[test]
    fn known_auc() {
        // Pairs (pos, neg): (0.35 vs 0.1) win, (0.35 vs 0.4) lose,
        // (0.8 vs 0.1) win, (0.8 vs 0.4) win => 3/4.
        let labels = [0.0, 0.0, 1.0, 1.0];
        let scores = [0.1, 0.4, 0.35, 0.8];
        assert!((roc_auc(&labels, &scores).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn auc_needs_both_classes() {
        assert!(roc_auc(&[1.0, 1.0], &[0.2, 0.3]).is_err());
    }

    #[test]
    fn accuracy_uses_inclusive_threshold() {
        let labels = [1.0, 0.0, 1.0, 0.0];
        let probs = [0.5, 0.49, 0.2, 0.9];
        assert_eq!(accuracy(&labels, &probs, 0.5).unwrap(), 0.5);
    }

    #[test]
    fn rmse_of_constant_error() {
        assert_eq!(rmse(&[1.0, 2.0, 3.0], &[2.0, 3.0, 4.0]).unwrap(), 1.0);
        assert!(matches!(rmse(&[], &[]), Err(CoreError::EmptyDataset)));
    }
}
