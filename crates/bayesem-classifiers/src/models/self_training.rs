//! Self-training feature expectation (SFE) likelihood correction.
//!
//! Each feature's log-likelihood under a label is shifted by
//! `log P(w) − log Σ_doc [P(label) · Π_f P(f|label)]`, where `P(w)` is the
//! word's marginal on unlabelled text and the sum runs over the labelled
//! documents. The per-label sums are kept in log space.
use std::collections::{BTreeMap, HashMap};

use rayon::prelude::*;

use crate::config::ClassifierConfig;
use crate::data_handling::{feature_marginals, Document, Feature, Label};
use crate::math::log_sum_exp;
use crate::models::counts::CountTables;
use crate::models::estimator::ProbabilityEstimator;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelfTrainingExpectation {
    word_probabilities: HashMap<Feature, f64>,
    log_normalisers: BTreeMap<Label, f64>,
}

impl SelfTrainingExpectation {
    pub fn from_parts(
        word_probabilities: HashMap<Feature, f64>,
        log_normalisers: BTreeMap<Label, f64>,
    ) -> Self {
        Self {
            word_probabilities,
            log_normalisers,
        }
    }

    /// Measure `P(w)` on `unlabelled` and the per-label normalising sums on
    /// `labelled`, using the standard smoothed estimates of `tables`.
    ///
    /// A label whose sum is zero or not finite gets no normaliser and keeps
    /// its standard likelihoods.
    pub fn estimate(
        tables: &CountTables,
        config: &ClassifierConfig,
        labelled: &[Document],
        unlabelled: &[Document],
    ) -> Self {
        let word_probabilities = feature_marginals(unlabelled);
        let estimator = ProbabilityEstimator::new(tables, config);
        let log_priors = estimator.log_label_priors();

        let log_normalisers: BTreeMap<Label, f64> = log_priors
            .par_iter()
            .filter_map(|(&label, &log_prior)| {
                let denominator = estimator.likelihood_denominator(label).ln();
                let terms: Vec<f64> = labelled
                    .iter()
                    .filter(|doc| doc.is_labelled())
                    .map(|doc| {
                        log_prior
                            + doc
                                .features
                                .iter()
                                .filter(|f| tables.vocabulary().contains(*f))
                                .map(|&f| estimator.likelihood_numerator(f, label).ln() - denominator)
                                .sum::<f64>()
                    })
                    .collect();
                let normaliser = log_sum_exp(terms.iter().copied());
                normaliser.is_finite().then_some((label, normaliser))
            })
            .collect();

        log::info!(
            "SFE correction fitted: {} unlabelled word marginals, {} label normalisers",
            word_probabilities.len(),
            log_normalisers.len()
        );
        Self::from_parts(word_probabilities, log_normalisers)
    }

    pub fn word_probabilities(&self) -> &HashMap<Feature, f64> {
        &self.word_probabilities
    }

    pub fn log_normalisers(&self) -> &BTreeMap<Label, f64> {
        &self.log_normalisers
    }

    /// Corrected log-likelihood. Falls back to `standard` when the word was
    /// never seen unlabelled or the label has no normaliser.
    pub fn adjust(&self, feature: Feature, label: Label, standard: f64) -> f64 {
        match (
            self.word_probabilities.get(&feature),
            self.log_normalisers.get(&label),
        ) {
            (Some(&p), Some(&normaliser)) if p > 0.0 => standard + p.ln() - normaliser,
            _ => standard,
        }
    }

    pub(crate) fn forget(&mut self, feature: Feature) {
        self.word_probabilities.remove(&feature);
    }
}
