//! Multinomial naive Bayes over TF-IDF rows with Lidstone smoothing.

use super::tfidf::SparseVector;
use crate::error::{MatchingError, Result};
use ndarray::{Array1, Array2};

#[derive(Debug, Clone)]
pub struct MultinomialNb {
    class_log_prior: Array1<f64>,
    /// `[n_classes, n_features]`
    feature_log_prob: Array2<f64>,
}

impl MultinomialNb {
    /// `targets[i]` is the class index of `rows[i]`; every class in
    /// `0..n_classes` must have at least one sample.
    pub fn fit(
        rows: &[SparseVector],
        targets: &[usize],
        n_classes: usize,
        n_features: usize,
        alpha: f64,
    ) -> Result<Self> {
        if rows.len() != targets.len() {
            return Err(MatchingError::InvalidInput(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        if alpha.is_nan() || alpha <= 0.0 {
            return Err(MatchingError::InvalidInput(format!(
                "smoothing alpha must be positive, got {alpha}"
            )));
        }

        let mut class_count = Array1::<f64>::zeros(n_classes);
        let mut feature_count = Array2::<f64>::zeros((n_classes, n_features));

        for (row, &class) in rows.iter().zip(targets) {
            if class >= n_classes {
                return Err(MatchingError::InvalidInput(format!(
                    "class index {class} out of range"
                )));
            }
            class_count[class] += 1.0;
            for &(feature, weight) in row {
                if feature < n_features {
                    feature_count[[class, feature]] += weight;
                }
            }
        }

        if let Some(empty) = class_count.iter().position(|&c| c == 0.0) {
            return Err(MatchingError::InsufficientData {
                required: 1,
                actual: empty,
            });
        }

        let total = class_count.sum();
        let class_log_prior = class_count.mapv(|c| (c / total).ln());

        let mut feature_log_prob = feature_count + alpha;
        for mut class_row in feature_log_prob.rows_mut() {
            let denom = class_row.sum();
            class_row.mapv_inplace(|v| (v / denom).ln());
        }

        Ok(Self {
            class_log_prior,
            feature_log_prob,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.class_log_prior.len()
    }

    /// Posterior distribution over classes, summing to 1.
    pub fn predict_proba(&self, row: &SparseVector) -> Vec<f64> {
        let n_features = self.feature_log_prob.ncols();
        let joint: Vec<f64> = (0..self.n_classes())
            .map(|class| {
                let likelihood: f64 = row
                    .iter()
                    .filter(|(feature, _)| *feature < n_features)
                    .map(|&(feature, weight)| weight * self.feature_log_prob[[class, feature]])
                    .sum();
                self.class_log_prior[class] + likelihood
            })
            .collect();

        let max = joint.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = joint.iter().map(|j| (j - max).exp()).collect();
        let sum: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / sum).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> MultinomialNb {
        // feature 0 marks class 0, feature 1 marks class 1
        let rows = vec![vec![(0, 1.0)], vec![(0, 1.0)], vec![(1, 1.0)]];
        MultinomialNb::fit(&rows, &[0, 0, 1], 2, 2, 1.0).unwrap()
    }

    #[test]
    fn test_predict_proba_sums_to_one() {
        let model = toy();
        let proba = model.predict_proba(&vec![(1, 1.0)]);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(proba[1] > proba[0]);
    }

    #[test]
    fn test_empty_row_follows_prior() {
        let model = toy();
        let proba = model.predict_proba(&Vec::new());
        assert!((proba[0] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_fit_rejects_class_without_samples() {
        let rows = vec![vec![(0, 1.0)]];
        assert!(MultinomialNb::fit(&rows, &[0], 2, 1, 1.0).is_err());
    }

    #[test]
    fn test_fit_rejects_bad_alpha() {
        let rows = vec![vec![(0, 1.0)]];
        assert!(MultinomialNb::fit(&rows, &[0], 1, 1, 0.0).is_err());
    }
}
