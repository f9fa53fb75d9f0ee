//! Univariate feature selection following scikit-learn's `chi2` and
//! `SelectKBest`.
//!
//! See: https://scikit-learn.org/stable/modules/feature_selection.html#univariate-feature-selection
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::data_handling::Feature;
use crate::models::counts::CountTables;
use crate::models::naive_bayes::NaiveBayesClassifier;

/// Chi-squared statistic of one feature against the label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureScore {
    pub feature: Feature,
    pub statistic: f64,
    pub p_value: f64,
}

/// Chi-squared statistics between every vocabulary feature and the label.
///
/// The observed frequency of a feature under a label is its joint count;
/// the expected frequency is the feature's total count spread over labels
/// in proportion to their document counts. Pseudo-counts are ignored. A
/// feature without real occurrences scores 0 with p-value 1.
///
/// # Returns
///
/// One score per vocabulary feature, in ascending feature order.
pub fn chi2(tables: &CountTables) -> Vec<FeatureScore> {
    let labels: Vec<_> = tables.labels().iter().copied().collect();
    let total_docs: f64 = labels.iter().map(|&l| tables.doc_count(l)).sum();
    let class_probabilities: Vec<f64> = labels
        .iter()
        .map(|&l| {
            if total_docs > 0.0 {
                tables.doc_count(l) / total_docs
            } else {
                0.0
            }
        })
        .collect();

    let degrees_of_freedom = labels.len().saturating_sub(1) as f64;
    let distribution = ChiSquared::new(degrees_of_freedom).ok();

    let mut features: Vec<Feature> = tables.vocabulary().iter().copied().collect();
    features.sort_unstable();

    features
        .into_iter()
        .map(|feature| {
            let observed: Vec<f64> = labels
                .iter()
                .map(|&l| tables.joint_count(l, feature))
                .collect();
            let feature_count: f64 = observed.iter().sum();

            let statistic: f64 = observed
                .iter()
                .zip(&class_probabilities)
                .map(|(&o, &p)| {
                    let expected = p * feature_count;
                    if expected > 0.0 {
                        (o - expected).powi(2) / expected
                    } else {
                        0.0
                    }
                })
                .sum();

            let p_value = match &distribution {
                Some(dist) if statistic.is_finite() => dist.sf(statistic),
                _ => 1.0,
            };
            FeatureScore {
                feature,
                statistic,
                p_value,
            }
        })
        .collect()
}

/// Select the k features with the largest chi-squared statistic.
pub struct SelectKBest {
    /// The number of top features to select.
    k: usize,
}

impl SelectKBest {
    pub fn new(k: usize) -> Self {
        SelectKBest { k }
    }

    /// The `k` best features of `tables`, best first. Ties keep the
    /// smaller feature id first.
    pub fn fit(&self, tables: &CountTables) -> Vec<Feature> {
        let mut scores = chi2(tables);
        scores.sort_by(|a, b| {
            b.statistic
                .partial_cmp(&a.statistic)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.feature.cmp(&b.feature))
        });
        scores.into_iter().take(self.k).map(|s| s.feature).collect()
    }

    /// Prune every feature outside the top `k` from `classifier`. Returns the
    /// number of features removed.
    pub fn apply(&self, classifier: &mut NaiveBayesClassifier) -> usize {
        let keep = self.fit(classifier.tables()).into_iter().collect();
        let removed = classifier.retain_features(&keep);
        log::info!(
            "SelectKBest kept {} features, removed {}",
            classifier.vocabulary().len(),
            removed
        );
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::Document;

    fn trained() -> NaiveBayesClassifier {
        let mut classifier = NaiveBayesClassifier::default();
        classifier.train(&[
            Document::labelled(0, vec![1, 1, 3]),
            Document::labelled(0, vec![1, 3, 4]),
            Document::labelled(1, vec![2, 2, 3]),
            Document::labelled(1, vec![2, 3]),
        ]);
        classifier
    }

    #[test]
    fn test_chi2_ranks_exclusive_features_above_shared() {
        let scores = chi2(trained().tables());
        assert_eq!(
            scores.iter().map(|s| s.feature).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
        // Feature 3 is split evenly between two equally sized labels.
        assert!(scores[2].statistic.abs() < 1e-12);
        assert!((scores[2].p_value - 1.0).abs() < 1e-12);
        assert!(scores[0].statistic > scores[3].statistic);
        assert!(scores[0].p_value < scores[2].p_value);
        for score in &scores {
            assert!((0.0..=1.0).contains(&score.p_value));
        }
    }

    #[test]
    fn test_single_label_scores_zero() {
        let mut classifier = NaiveBayesClassifier::default();
        classifier.train(&[Document::labelled(0, vec![1, 2])]);
        for score in chi2(classifier.tables()) {
            assert_eq!(score.statistic, 0.0);
            assert_eq!(score.p_value, 1.0);
        }
    }

    #[test]
    fn test_select_k_best_prunes_classifier() {
        let mut classifier = trained();
        let selector = SelectKBest::new(2);
        let best = selector.fit(classifier.tables());
        assert_eq!(best.len(), 2);
        assert!(best.contains(&1));
        assert!(best.contains(&2));

        assert_eq!(selector.apply(&mut classifier), 2);
        assert_eq!(classifier.vocabulary().len(), 2);
        assert!(!classifier.tables().references_feature(3));
    }
}
