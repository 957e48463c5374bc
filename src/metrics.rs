//! Binary-classification evaluation metrics.
//!
//! Labels follow the positive=1 convention (malignant), negative=0 (benign).

use crate::error::{HistonetError, Result};

/// 2x2 confusion matrix for a binary classifier.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub true_positives: usize,
}

impl ConfusionMatrix {
    /// Tally predicted vs. true labels. Labels must be 0 or 1 and the two
    /// slices must have equal length.
    pub fn from_labels(predicted: &[usize], actual: &[usize]) -> Result<Self> {
        if predicted.len() != actual.len() {
            return Err(HistonetError::InvalidParameter(format!(
                "label count mismatch: {} predicted vs {} actual",
                predicted.len(),
                actual.len()
            )));
        }

        let mut cm = ConfusionMatrix::default();
        for (&p, &a) in predicted.iter().zip(actual) {
            match (a, p) {
                (0, 0) => cm.true_negatives += 1,
                (0, 1) => cm.false_positives += 1,
                (1, 0) => cm.false_negatives += 1,
                (1, 1) => cm.true_positives += 1,
                _ => {
                    return Err(HistonetError::InvalidParameter(format!(
                        "labels must be 0 or 1, got predicted={p} actual={a}"
                    )))
                }
            }
        }
        Ok(cm)
    }

    pub fn total(&self) -> usize {
        self.true_negatives + self.false_positives + self.false_negatives + self.true_positives
    }

    pub fn accuracy(&self) -> f64 {
        ratio(
            self.true_positives + self.true_negatives,
            self.total(),
        )
    }

    /// TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// TP / (TP + FN), a.k.a. sensitivity
    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// TN / (TN + FP)
    pub fn specificity(&self) -> f64 {
        ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }

    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// Mean of recall and specificity; robust to class imbalance.
    pub fn balanced_accuracy(&self) -> f64 {
        (self.recall() + self.specificity()) / 2.0
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Half-width of the 95% normal-approximation confidence interval for an
/// accuracy estimated over `n` samples.
pub fn interval95(accuracy: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    1.96 * (accuracy * (1.0 - accuracy) / n as f64).sqrt()
}

/// ROC curve points as `(fpr, tpr, threshold)`, sorted by descending
/// threshold. A sample is predicted positive when its score >= threshold.
pub fn roc_curve(scores: &[f64], actual: &[usize]) -> Result<Vec<(f64, f64, f64)>> {
    if scores.len() != actual.len() {
        return Err(HistonetError::InvalidParameter(format!(
            "score count mismatch: {} scores vs {} labels",
            scores.len(),
            actual.len()
        )));
    }

    let positives = actual.iter().filter(|&&a| a == 1).count();
    let negatives = actual.len() - positives;

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&i, &j| {
        scores[j]
            .partial_cmp(&scores[i])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut points = vec![(0.0, 0.0, f64::INFINITY)];
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut i = 0;
    while i < order.len() {
        let threshold = scores[order[i]];
        // Consume all samples tied at this score before emitting a point
        while i < order.len() && scores[order[i]] == threshold {
            if actual[order[i]] == 1 {
                tp += 1;
            } else {
                fp += 1;
            }
            i += 1;
        }
        let tpr = ratio(tp, positives);
        let fpr = ratio(fp, negatives);
        points.push((fpr, tpr, threshold));
    }
    Ok(points)
}

/// Area under the ROC curve by trapezoidal integration.
pub fn auc(scores: &[f64], actual: &[usize]) -> Result<f64> {
    let points = roc_curve(scores, actual)?;
    let mut area = 0.0;
    for pair in points.windows(2) {
        let (fpr0, tpr0, _) = pair[0];
        let (fpr1, tpr1, _) = pair[1];
        area += (fpr1 - fpr0) * (tpr0 + tpr1) / 2.0;
    }
    Ok(area)
}
