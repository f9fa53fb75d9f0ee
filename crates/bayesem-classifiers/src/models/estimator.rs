//! Smoothed probability estimates over [`CountTables`].
//!
//! Everything here is a pure function of the tables and the smoothing
//! constants; the estimator holds borrows only.
use std::collections::BTreeMap;

use crate::config::ClassifierConfig;
use crate::data_handling::{Feature, Label};
use crate::models::counts::CountTables;

#[derive(Debug, Clone, Copy)]
pub struct ProbabilityEstimator<'a> {
    tables: &'a CountTables,
    config: &'a ClassifierConfig,
}

impl<'a> ProbabilityEstimator<'a> {
    pub fn new(tables: &'a CountTables, config: &'a ClassifierConfig) -> Self {
        Self { tables, config }
    }

    /// Denominator of `P(feature|label)`, shared by every feature of a label.
    pub fn likelihood_denominator(&self, label: Label) -> f64 {
        self.tables.pseudo_count_total(label)
            + self.config.feature_smoothing * self.tables.vocabulary().len() as f64
            + self.tables.label_feature_count(label)
    }

    pub fn likelihood_numerator(&self, feature: Feature, label: Label) -> f64 {
        self.config.feature_smoothing
            + self.tables.feature_pseudo_count(label, feature)
            + self.tables.joint_count(label, feature)
    }

    /// `P(feature|label)` with additive smoothing and pseudo-counts.
    ///
    /// Strictly positive whenever `feature_smoothing > 0` and the vocabulary
    /// is non-empty.
    pub fn feature_likelihood(&self, feature: Feature, label: Label) -> f64 {
        self.likelihood_numerator(feature, label) / self.likelihood_denominator(label)
    }

    pub fn log_feature_likelihood(&self, feature: Feature, label: Label) -> f64 {
        self.feature_likelihood(feature, label).ln()
    }

    fn label_numerator(&self, label: Label) -> f64 {
        let empirical = if self.config.empirical_label_priors {
            self.tables.doc_count(label)
        } else {
            1.0
        };
        self.tables.label_multiplier(label)
            * (self.config.label_smoothing + self.tables.label_pseudo_count(label) + empirical)
    }

    /// `P(label)` for every label, normalised over the full label set.
    /// Uniform when no label has prior mass, e.g. every multiplier is 0.
    pub fn label_priors(&self) -> BTreeMap<Label, f64> {
        let mut priors: BTreeMap<Label, f64> = self
            .tables
            .labels()
            .iter()
            .map(|&label| (label, self.label_numerator(label)))
            .collect();
        let total: f64 = priors.values().sum();
        if total > 0.0 && total.is_finite() {
            for value in priors.values_mut() {
                *value /= total;
            }
        } else {
            let uniform = 1.0 / priors.len() as f64;
            priors.values_mut().for_each(|value| *value = uniform);
        }
        priors
    }

    pub fn log_label_priors(&self) -> BTreeMap<Label, f64> {
        self.label_priors()
            .into_iter()
            .map(|(label, prior)| (label, prior.ln()))
            .collect()
    }

    /// `P(label)` for a single label.
    pub fn label_prior(&self, label: Label) -> f64 {
        self.label_priors().get(&label).copied().unwrap_or(0.0)
    }
}
