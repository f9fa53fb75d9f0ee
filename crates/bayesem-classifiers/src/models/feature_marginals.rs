//! Feature-marginals semi-supervised likelihoods (Lucas & Downey, 2013).
//!
//! For a binary problem the class-conditional probability `θ = P(w|+)` of
//! each word is chosen to maximise the labelled-data likelihood subject to
//! the constraint that `θ·P(t|+) + P(w|-)·P(t|-)` reproduces the word's
//! marginal probability `P(w)` measured on unlabelled text. Setting the
//! derivative of that constrained likelihood to zero gives the rational
//! function in [`FeatureMarginalsConstraint`], solved per word with
//! Newton-Raphson.
use std::collections::HashMap;

use crate::config::ClassifierConfig;
use crate::data_handling::{Feature, Label};
use crate::error::{ClassifierError, Result};
use crate::math::{normalise_in_place, DifferentiableFunction, NewtonRaphsonSolver};
use crate::models::counts::CountTables;

/// `N(w|+)/θ + N(¬w|+)/(θ−1) + l·N(w|-)/(lθ−k) + l·N(¬w|-)/(lθ−k+1)`
///
/// with `l = P(t|+)/P(t|-)` and `k = P(w)/P(t|-)`. Poles sit at `θ = 0`,
/// `θ = 1`, `θ = k/l` and `θ = (k−1)/l`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureMarginalsConstraint {
    pub word_given_positive: f64,
    pub not_word_given_positive: f64,
    pub word_given_negative: f64,
    pub not_word_given_negative: f64,
    pub l: f64,
    pub k: f64,
}

impl DifferentiableFunction for FeatureMarginalsConstraint {
    fn value(&self, theta: f64) -> f64 {
        let lt = self.l * theta;
        self.word_given_positive / theta
            + self.not_word_given_positive / (theta - 1.0)
            + self.l * self.word_given_negative / (lt - self.k)
            + self.l * self.not_word_given_negative / (lt - self.k + 1.0)
    }

    fn derivative(&self, theta: f64) -> f64 {
        let lt = self.l * theta;
        let l2 = self.l * self.l;
        -self.word_given_positive / (theta * theta)
            - self.not_word_given_positive / ((theta - 1.0) * (theta - 1.0))
            - l2 * self.word_given_negative / ((lt - self.k) * (lt - self.k))
            - l2 * self.not_word_given_negative / ((lt - self.k + 1.0) * (lt - self.k + 1.0))
    }
}

/// Optimised class-conditional probabilities for a binary classifier.
///
/// Only words whose constraint produced an admissible root are present;
/// everything else falls back to the standard smoothed likelihood.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMarginals {
    positive: Label,
    negative: Label,
    positive_probabilities: HashMap<Feature, f64>,
    negative_probabilities: HashMap<Feature, f64>,
}

impl FeatureMarginals {
    pub fn from_parts(
        positive: Label,
        negative: Label,
        positive_probabilities: HashMap<Feature, f64>,
        negative_probabilities: HashMap<Feature, f64>,
    ) -> Self {
        Self {
            positive,
            negative,
            positive_probabilities,
            negative_probabilities,
        }
    }

    /// Solve the constraint for every vocabulary word of a two-label table.
    ///
    /// The smaller label id is the positive class. `word_probabilities` holds
    /// `P(w)` measured on unlabelled documents.
    ///
    /// # Errors
    ///
    /// `NotBinary` unless the table has exactly two labels. Per-word solver
    /// failures are skipped, not returned.
    pub fn estimate(
        tables: &CountTables,
        word_probabilities: &HashMap<Feature, f64>,
        config: &ClassifierConfig,
    ) -> Result<Self> {
        let labels: Vec<Label> = tables.labels().iter().copied().collect();
        if labels.len() != 2 {
            return Err(ClassifierError::NotBinary {
                labels: labels.len(),
            });
        }
        let (positive, negative) = (labels[0], labels[1]);
        let mut marginals = Self::from_parts(positive, negative, HashMap::new(), HashMap::new());

        let positive_tokens = tables.label_feature_count(positive);
        let negative_tokens = tables.label_feature_count(negative);
        let total_tokens = positive_tokens + negative_tokens;
        if positive_tokens <= 0.0 || negative_tokens <= 0.0 {
            log::debug!("Feature marginals skipped: a class has no labelled tokens");
            return Ok(marginals);
        }
        let positive_prior = positive_tokens / total_tokens;
        let negative_prior = negative_tokens / total_tokens;
        let l = positive_prior / negative_prior;

        let solver = NewtonRaphsonSolver::new(config.newton_raphson_accuracy);
        let mut vocabulary: Vec<Feature> = tables.vocabulary().iter().copied().collect();
        vocabulary.sort_unstable();

        let mut failed = 0usize;
        let mut rejected = 0usize;
        for word in vocabulary {
            let word_probability = word_probabilities.get(&word).copied().unwrap_or(0.0);
            if word_probability <= 0.0 {
                continue;
            }
            let word_given_positive = tables.joint_count(positive, word);
            let word_given_negative = tables.joint_count(negative, word);
            let constraint = FeatureMarginalsConstraint {
                word_given_positive,
                not_word_given_positive: positive_tokens - word_given_positive,
                word_given_negative,
                not_word_given_negative: negative_tokens - word_given_negative,
                l,
                k: word_probability / negative_prior,
            };
            if !(constraint.not_word_given_positive > 0.0 && constraint.word_given_negative > 0.0) {
                continue;
            }

            let upper = word_probability / positive_prior;
            let theta = match solver.solve(
                config.max_newton_raphson_evaluations,
                &constraint,
                0.0,
                upper,
            ) {
                Ok(theta) => theta,
                Err(e) => {
                    log::trace!("Feature {}: no root ({})", word, e);
                    failed += 1;
                    continue;
                }
            };

            let negative_theta = (word_probability - theta * positive_prior) / negative_prior;
            let admissible = theta > 0.0
                && theta < 1.0
                && theta < upper
                && negative_theta > 0.0
                && negative_theta < 1.0;
            if !admissible {
                log::trace!("Feature {}: root {} outside (0, {})", word, theta, upper);
                rejected += 1;
                continue;
            }
            marginals.positive_probabilities.insert(word, theta);
            marginals.negative_probabilities.insert(word, negative_theta);
        }

        normalise_in_place(&mut marginals.positive_probabilities);
        normalise_in_place(&mut marginals.negative_probabilities);

        log::info!(
            "Feature marginals optimised {} of {} features ({} did not converge, {} out of range)",
            marginals.len(),
            tables.vocabulary().len(),
            failed,
            rejected
        );
        Ok(marginals)
    }

    pub fn positive(&self) -> Label {
        self.positive
    }

    pub fn negative(&self) -> Label {
        self.negative
    }

    pub fn positive_probabilities(&self) -> &HashMap<Feature, f64> {
        &self.positive_probabilities
    }

    pub fn negative_probabilities(&self) -> &HashMap<Feature, f64> {
        &self.negative_probabilities
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.positive_probabilities.contains_key(&feature)
    }

    pub fn len(&self) -> usize {
        self.positive_probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positive_probabilities.is_empty()
    }

    /// Optimised `P(feature|label)`, if one was accepted for this word.
    pub fn probability(&self, feature: Feature, label: Label) -> Option<f64> {
        if label == self.positive {
            self.positive_probabilities.get(&feature).copied()
        } else if label == self.negative {
            self.negative_probabilities.get(&feature).copied()
        } else {
            None
        }
    }

    /// Remove a pruned feature from both distributions.
    pub(crate) fn forget(&mut self, feature: Feature) {
        self.positive_probabilities.remove(&feature);
        self.negative_probabilities.remove(&feature);
    }
}
