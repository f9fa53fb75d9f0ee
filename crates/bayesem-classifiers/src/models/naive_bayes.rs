//! Counting multinomial Naive Bayes with pseudo-count steering and EM.
//!
//! All training paths funnel through [`NaiveBayesClassifier::train_on_instance`].
//! The classifier is single-writer: mutation needs `&mut self`, while any
//! number of readers may predict concurrently through `&self`.
use std::collections::{BTreeMap, BTreeSet, HashSet};

use rayon::prelude::*;

use crate::config::{ClassifierConfig, ClassifierKind};
use crate::data_handling::{feature_marginals, Document, Feature, Label, LabelDistribution};
use crate::error::{ClassifierError, Result};
use crate::math::{argmax, softmax};
use crate::models::adjustment::LikelihoodAdjustment;
use crate::models::classifier_trait::Classifier;
use crate::models::counts::CountTables;
use crate::models::estimator::ProbabilityEstimator;
use crate::models::feature_marginals::FeatureMarginals;
use crate::models::precomputed::PrecomputedClassifier;
use crate::models::self_training::SelfTrainingExpectation;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NaiveBayesClassifier {
    config: ClassifierConfig,
    tables: CountTables,
    adjustment: LikelihoodAdjustment,
}

impl NaiveBayesClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            tables: CountTables::new(),
            adjustment: LikelihoodAdjustment::Standard,
        }
    }

    /// Like [`Self::new`], but rejects a config whose constants would make
    /// a likelihood or prior degenerate.
    pub fn try_new(config: ClassifierConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// An untrained classifier that already knows `labels`, so it assigns
    /// non-zero probability to each of them before any data arrives.
    pub fn with_labels<I: IntoIterator<Item = Label>>(config: ClassifierConfig, labels: I) -> Self {
        let mut classifier = Self::new(config);
        for label in labels {
            classifier.tables.add_label(label);
        }
        classifier
    }

    pub(crate) fn from_parts(
        config: ClassifierConfig,
        tables: CountTables,
        adjustment: LikelihoodAdjustment,
    ) -> Self {
        Self {
            config,
            tables,
            adjustment,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn tables(&self) -> &CountTables {
        &self.tables
    }

    pub fn adjustment(&self) -> &LikelihoodAdjustment {
        &self.adjustment
    }

    pub fn set_adjustment(&mut self, adjustment: LikelihoodAdjustment) {
        self.adjustment = adjustment;
    }

    pub fn kind(&self) -> ClassifierKind {
        self.adjustment.kind()
    }

    pub fn estimator(&self) -> ProbabilityEstimator<'_> {
        ProbabilityEstimator::new(&self.tables, &self.config)
    }

    pub fn label_set(&self) -> &BTreeSet<Label> {
        self.tables.labels()
    }

    pub fn vocabulary(&self) -> &HashSet<Feature> {
        self.tables.vocabulary()
    }

    pub fn seed_label(&mut self, label: Label) {
        self.tables.add_label(label);
    }

    /// Add one (possibly fractional) observation.
    ///
    /// No-op when `label` is `None` or `features` is empty. Otherwise the
    /// document count and every joint count grow by
    /// `label_probability * weight`.
    pub fn train_on_instance(
        &mut self,
        label: Option<Label>,
        features: &[Feature],
        label_probability: f64,
        weight: f64,
    ) {
        let Some(label) = label else {
            log::trace!("Skipping unlabelled instance");
            return;
        };
        if features.is_empty() {
            log::trace!("Skipping empty instance for label {}", label);
            return;
        }
        self.tables
            .add_instance(label, features, label_probability * weight);
    }

    /// Train on every labelled document with weight 1.
    pub fn train(&mut self, documents: &[Document]) {
        self.train_with_weight(documents, 1.0);
    }

    pub fn train_with_weight(&mut self, documents: &[Document], weight: f64) {
        for doc in documents {
            self.train_on_instance(doc.label, &doc.features, 1.0, weight);
        }
        log::debug!(
            "Trained on {} documents (weight {}); {} labels, {} features",
            documents.len(),
            weight,
            self.tables.labels().len(),
            self.tables.vocabulary().len()
        );
    }

    /// Train with one weight per document.
    ///
    /// # Errors
    ///
    /// `WeightLengthMismatch` if the lengths differ; nothing is trained.
    pub fn train_weighted(&mut self, documents: &[Document], weights: &[f64]) -> Result<()> {
        if documents.len() != weights.len() {
            return Err(ClassifierError::WeightLengthMismatch {
                documents: documents.len(),
                weights: weights.len(),
            });
        }
        for (doc, &weight) in documents.iter().zip(weights) {
            self.train_on_instance(doc.label, &doc.features, 1.0, weight);
        }
        Ok(())
    }

    /// One EM cycle using this classifier for the expectation step.
    ///
    /// `weight` defaults to `config.em_weight`.
    pub fn em_train(&mut self, documents: &[Document], weight: Option<f64>) -> Result<()> {
        let weight = weight.unwrap_or(self.config.em_weight);
        let scratch = Self::expectation(&*self, documents, weight)?;
        self.tables.merge(scratch);
        Ok(())
    }

    /// One EM cycle with a separate classifier producing the posteriors.
    pub fn em_train_with<C: Classifier + ?Sized>(
        &mut self,
        documents: &[Document],
        weight: Option<f64>,
        e_step: &C,
    ) -> Result<()> {
        let weight = weight.unwrap_or(self.config.em_weight);
        let scratch = Self::expectation(e_step, documents, weight)?;
        self.tables.merge(scratch);
        Ok(())
    }

    /// E-step: soft-label every unlabelled, non-empty document into a fresh
    /// table. Posteriors are computed in parallel; accumulation is sequential.
    fn expectation<C: Classifier + ?Sized>(
        e_step: &C,
        documents: &[Document],
        weight: f64,
    ) -> Result<CountTables> {
        let targets: Vec<&Document> = documents
            .iter()
            .filter(|doc| !doc.is_labelled() && !doc.features.is_empty())
            .collect();

        let posteriors: Vec<LabelDistribution> = targets
            .par_iter()
            .map(|doc| e_step.predict(&doc.features))
            .collect::<Result<Vec<_>>>()?;

        let mut scratch = CountTables::new();
        for (doc, posterior) in targets.iter().zip(posteriors) {
            for (label, probability) in posterior {
                scratch.add_instance(label, &doc.features, probability * weight);
            }
        }
        log::debug!(
            "EM expectation over {} of {} documents with {} (weight {})",
            targets.len(),
            documents.len(),
            e_step.name(),
            weight
        );
        Ok(scratch)
    }

    /// Fit the feature-marginals adjustment from `unlabelled` word marginals.
    pub fn fit_feature_marginals(&mut self, unlabelled: &[Document]) -> Result<()> {
        let word_probabilities = feature_marginals(unlabelled);
        let marginals = FeatureMarginals::estimate(&self.tables, &word_probabilities, &self.config)?;
        self.adjustment = LikelihoodAdjustment::FeatureMarginals(marginals);
        Ok(())
    }

    /// Fit the SFE correction. Normalisers use the standard likelihoods of
    /// the current counts.
    pub fn fit_self_training(&mut self, labelled: &[Document], unlabelled: &[Document]) {
        let sfe = SelfTrainingExpectation::estimate(&self.tables, &self.config, labelled, unlabelled);
        self.adjustment = LikelihoodAdjustment::SelfTraining(sfe);
    }

    /// Log-likelihood of `feature` under `label` after the adjustment.
    pub fn log_likelihood(&self, feature: Feature, label: Label) -> f64 {
        let standard = self.estimator().log_feature_likelihood(feature, label);
        self.adjustment.log_likelihood(feature, label, standard)
    }

    pub fn feature_likelihood(&self, feature: Feature, label: Label) -> f64 {
        self.estimator().feature_likelihood(feature, label)
    }

    pub fn label_priors(&self) -> BTreeMap<Label, f64> {
        self.estimator().label_priors()
    }

    pub fn label_prior(&self, label: Label) -> f64 {
        self.estimator().label_prior(label)
    }

    /// Unnormalised `log P(label) + Σ log P(f|label)` per label. Features
    /// outside the vocabulary are skipped.
    pub fn log_scores(&self, features: &[Feature]) -> Result<BTreeMap<Label, f64>> {
        if self.tables.labels().is_empty() {
            return Err(ClassifierError::NoLabels);
        }
        self.config.validate()?;
        let estimator = self.estimator();
        let mut scores = estimator.log_label_priors();
        let known: Vec<Feature> = features
            .iter()
            .copied()
            .filter(|f| self.tables.vocabulary().contains(f))
            .collect();
        if known.is_empty() {
            return Ok(scores);
        }
        for (&label, score) in scores.iter_mut() {
            let log_denominator = estimator.likelihood_denominator(label).ln();
            for &feature in &known {
                let standard = estimator.likelihood_numerator(feature, label).ln() - log_denominator;
                *score += self.adjustment.log_likelihood(feature, label, standard);
            }
        }
        Ok(scores)
    }

    pub fn predict(&self, features: &[Feature]) -> Result<LabelDistribution> {
        Ok(softmax(&self.log_scores(features)?))
    }

    /// Argmax of the unnormalised scores; ties go to the smallest label.
    pub fn best_label(&self, features: &[Feature]) -> Result<Label> {
        argmax(&self.log_scores(features)?).ok_or(ClassifierError::NoLabels)
    }

    /// Freeze the current state into log-probability lookup tables.
    pub fn precompute(&self) -> PrecomputedClassifier {
        PrecomputedClassifier::compute_probabilities(self)
    }

    /// Pin the pseudo-count of `label`. Negative values are clamped to 0.
    pub fn set_label_alpha(&mut self, label: Label, alpha: f64) {
        self.tables.set_label_pseudo_count(label, alpha.max(0.0));
    }

    /// Pin the pseudo-count of `feature` under `label`. Zero or negative
    /// values unpin it, as [`Self::unlabel_feature`] does.
    pub fn set_feature_alpha(&mut self, feature: Feature, label: Label, alpha: f64) {
        if alpha > 0.0 {
            self.tables.set_feature_pseudo_count(feature, label, alpha);
        } else {
            self.tables.add_label(label);
            self.unlabel_feature(feature, label);
        }
    }

    /// Reset the pseudo-count of `feature` under `label` to zero, dropping the
    /// feature from the vocabulary if nothing else references it.
    pub fn unlabel_feature(&mut self, feature: Feature, label: Label) {
        if self.tables.clear_feature_pseudo_count(feature, label) {
            self.adjustment.forget(feature);
            log::debug!("Feature {} left the vocabulary", feature);
        }
    }

    pub fn set_label_multiplier(&mut self, label: Label, multiplier: f64) {
        self.tables.set_label_multiplier(label, multiplier.max(0.0));
    }

    pub fn label_alpha(&self, label: Label) -> f64 {
        self.tables.label_pseudo_count(label)
    }

    pub fn feature_alpha(&self, feature: Feature, label: Label) -> f64 {
        self.tables.feature_pseudo_count(label, feature)
    }

    pub fn label_multiplier(&self, label: Label) -> f64 {
        self.tables.label_multiplier(label)
    }

    /// Features whose real plus pseudo count over all labels is below
    /// `cutoff`, in ascending id order.
    pub fn infrequent_features(&self, cutoff: f64) -> Vec<Feature> {
        let mut features: Vec<Feature> = self
            .tables
            .vocabulary()
            .iter()
            .copied()
            .filter(|&f| self.tables.feature_total(f) < cutoff)
            .collect();
        features.sort_unstable();
        features
    }

    /// Irreversibly remove every feature below `cutoff`. Returns how many
    /// were removed.
    pub fn trim_infrequent_features(&mut self, cutoff: f64) -> usize {
        let infrequent = self.infrequent_features(cutoff);
        for &feature in &infrequent {
            self.remove_feature(feature);
        }
        log::info!(
            "Trimmed {} features below {}; {} remain",
            infrequent.len(),
            cutoff,
            self.tables.vocabulary().len()
        );
        infrequent.len()
    }

    /// Irreversibly remove every feature not in `keep`.
    pub fn retain_features(&mut self, keep: &HashSet<Feature>) -> usize {
        let dropped: Vec<Feature> = self
            .tables
            .vocabulary()
            .iter()
            .copied()
            .filter(|f| !keep.contains(f))
            .collect();
        for &feature in &dropped {
            self.remove_feature(feature);
        }
        dropped.len()
    }

    fn remove_feature(&mut self, feature: Feature) {
        self.tables.remove_feature(feature);
        self.adjustment.forget(feature);
    }

    /// The `k` features most indicative of `label`, scored by log-likelihood
    /// ratio against the strongest competing label.
    pub fn top_features(&self, label: Label, k: usize) -> Vec<(Feature, f64)> {
        let others: Vec<Label> = self
            .tables
            .labels()
            .iter()
            .copied()
            .filter(|&l| l != label)
            .collect();
        let mut scored: Vec<(Feature, f64)> = self
            .tables
            .vocabulary()
            .iter()
            .map(|&feature| {
                let own = self.log_likelihood(feature, label);
                let rival = others
                    .iter()
                    .map(|&other| self.log_likelihood(feature, other))
                    .fold(f64::NEG_INFINITY, f64::max);
                let score = if rival.is_finite() { own - rival } else { own };
                (feature, score)
            })
            .collect();
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });
        scored.truncate(k);
        scored
    }
}

impl Classifier for NaiveBayesClassifier {
    fn labels(&self) -> Vec<Label> {
        self.tables.labels().iter().copied().collect()
    }

    fn predict(&self, features: &[Feature]) -> Result<LabelDistribution> {
        NaiveBayesClassifier::predict(self, features)
    }

    fn best_label(&self, features: &[Feature]) -> Result<Label> {
        NaiveBayesClassifier::best_label(self, features)
    }

    fn name(&self) -> &str {
        self.adjustment.kind().name()
    }
}
