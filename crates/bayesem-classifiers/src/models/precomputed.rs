//! Immutable log-probability snapshot of a [`NaiveBayesClassifier`].
//!
//! Every `(label, feature)` log-likelihood, including any feature-marginals
//! or SFE adjustment, is baked once; prediction is lookup plus summation.
//! The snapshot is `Send + Sync` and safe to share across inference threads.
use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;

use crate::config::ClassifierKind;
use crate::data_handling::{Feature, Label, LabelDistribution};
use crate::error::{ClassifierError, Result};
use crate::math::{argmax, softmax};
use crate::models::classifier_trait::Classifier;
use crate::models::naive_bayes::NaiveBayesClassifier;

#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputedClassifier {
    kind: ClassifierKind,
    labels: Vec<Label>,
    log_label_priors: Vec<f64>,
    /// One entry per vocabulary feature, indexed in `labels` order
    log_feature_likelihoods: HashMap<Feature, Vec<f64>>,
}

impl PrecomputedClassifier {
    /// Bake the log priors and adjusted log-likelihoods of `classifier`.
    pub fn compute_probabilities(classifier: &NaiveBayesClassifier) -> Self {
        let estimator = classifier.estimator();
        let priors = estimator.log_label_priors();
        let labels: Vec<Label> = priors.keys().copied().collect();
        let log_label_priors: Vec<f64> = priors.values().copied().collect();
        let log_denominators: Vec<f64> = labels
            .iter()
            .map(|&label| estimator.likelihood_denominator(label).ln())
            .collect();

        let vocabulary: Vec<Feature> = classifier.vocabulary().iter().copied().collect();
        let log_feature_likelihoods: HashMap<Feature, Vec<f64>> = vocabulary
            .par_iter()
            .map(|&feature| {
                let row = labels
                    .iter()
                    .zip(&log_denominators)
                    .map(|(&label, &log_denominator)| {
                        let standard =
                            estimator.likelihood_numerator(feature, label).ln() - log_denominator;
                        classifier.adjustment().log_likelihood(feature, label, standard)
                    })
                    .collect();
                (feature, row)
            })
            .collect();

        log::debug!(
            "Precomputed {} x {} log-likelihood table",
            labels.len(),
            log_feature_likelihoods.len()
        );
        Self {
            kind: classifier.kind(),
            labels,
            log_label_priors,
            log_feature_likelihoods,
        }
    }

    pub fn kind(&self) -> ClassifierKind {
        self.kind
    }

    pub fn vocabulary_len(&self) -> usize {
        self.log_feature_likelihoods.len()
    }

    pub fn log_label_prior(&self, label: Label) -> Option<f64> {
        let index = self.labels.binary_search(&label).ok()?;
        Some(self.log_label_priors[index])
    }

    pub fn log_feature_likelihood(&self, feature: Feature, label: Label) -> Option<f64> {
        let index = self.labels.binary_search(&label).ok()?;
        self.log_feature_likelihoods
            .get(&feature)
            .map(|row| row[index])
    }

    /// Unnormalised log scores, identical to
    /// [`NaiveBayesClassifier::log_scores`] on the snapshot's source.
    pub fn log_scores(&self, features: &[Feature]) -> Result<BTreeMap<Label, f64>> {
        if self.labels.is_empty() {
            return Err(ClassifierError::NoLabels);
        }
        let mut scores = self.log_label_priors.clone();
        for feature in features {
            if let Some(row) = self.log_feature_likelihoods.get(feature) {
                for (score, value) in scores.iter_mut().zip(row) {
                    *score += value;
                }
            }
        }
        Ok(self.labels.iter().copied().zip(scores).collect())
    }

    pub fn predict(&self, features: &[Feature]) -> Result<LabelDistribution> {
        Ok(softmax(&self.log_scores(features)?))
    }

    pub fn best_label(&self, features: &[Feature]) -> Result<Label> {
        argmax(&self.log_scores(features)?).ok_or(ClassifierError::NoLabels)
    }
}

impl Classifier for PrecomputedClassifier {
    fn labels(&self) -> Vec<Label> {
        self.labels.clone()
    }

    fn predict(&self, features: &[Feature]) -> Result<LabelDistribution> {
        PrecomputedClassifier::predict(self, features)
    }

    fn best_label(&self, features: &[Feature]) -> Result<Label> {
        PrecomputedClassifier::best_label(self, features)
    }

    fn name(&self) -> &str {
        "precomputed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::Document;

    fn trained() -> NaiveBayesClassifier {
        let mut classifier = NaiveBayesClassifier::default();
        classifier.train(&[
            Document::labelled(0, vec![1, 2, 2, 3]),
            Document::labelled(1, vec![3, 4, 4]),
            Document::labelled(2, vec![5, 1]),
        ]);
        classifier.set_feature_alpha(6, 2, 3.0);
        classifier.set_label_alpha(1, 2.0);
        classifier
    }

    #[test]
    fn test_scores_match_source() {
        let classifier = trained();
        let snapshot = classifier.precompute();
        for features in [vec![1, 2], vec![4, 4, 6], vec![99], vec![]] {
            let expected = classifier.log_scores(&features).unwrap();
            let actual = snapshot.log_scores(&features).unwrap();
            for (label, value) in expected {
                assert!((actual[&label] - value).abs() < 1e-9);
            }
            assert_eq!(
                snapshot.best_label(&features).unwrap(),
                classifier.best_label(&features).unwrap()
            );
        }
    }

    #[test]
    fn test_snapshot_ignores_later_training() {
        let mut classifier = trained();
        let snapshot = classifier.precompute();
        let before = snapshot.predict(&[3]).unwrap();
        classifier.train(&[Document::labelled(1, vec![3, 3, 3, 3])]);
        assert_eq!(snapshot.predict(&[3]).unwrap(), before);
    }

    #[test]
    fn test_concurrent_reads() {
        let snapshot = trained().precompute();
        let expected = snapshot.best_label(&[4]).unwrap();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..100 {
                        assert_eq!(snapshot.best_label(&[4]).unwrap(), expected);
                    }
                });
            }
        });
    }

    #[test]
    fn test_lookup_accessors() {
        let snapshot = trained().precompute();
        assert_eq!(snapshot.vocabulary_len(), 6);
        assert!(snapshot.log_label_prior(1).is_some());
        assert!(snapshot.log_label_prior(9).is_none());
        assert!(snapshot.log_feature_likelihood(6, 2).unwrap() > snapshot.log_feature_likelihood(6, 0).unwrap());
    }
}
