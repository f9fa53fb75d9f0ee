use crate::config::ClassifierKind;
use crate::data_handling::{Feature, Label};
use crate::models::feature_marginals::FeatureMarginals;
use crate::models::self_training::SelfTrainingExpectation;

/// Per-feature likelihood strategy plugged into the counting classifier.
///
/// Each variant only changes how one feature's log-likelihood under one label
/// is scored; priors, vocabulary filtering and normalisation are shared.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LikelihoodAdjustment {
    #[default]
    Standard,
    FeatureMarginals(FeatureMarginals),
    SelfTraining(SelfTrainingExpectation),
}

impl LikelihoodAdjustment {
    pub fn kind(&self) -> ClassifierKind {
        match self {
            LikelihoodAdjustment::Standard => ClassifierKind::Standard,
            LikelihoodAdjustment::FeatureMarginals(_) => ClassifierKind::FeatureMarginals,
            LikelihoodAdjustment::SelfTraining(_) => ClassifierKind::SelfTrainingExpectation,
        }
    }

    /// Log-likelihood of `feature` under `label`, given the standard smoothed
    /// value.
    pub fn log_likelihood(&self, feature: Feature, label: Label, standard: f64) -> f64 {
        match self {
            LikelihoodAdjustment::Standard => standard,
            LikelihoodAdjustment::FeatureMarginals(marginals) => marginals
                .probability(feature, label)
                .map(f64::ln)
                .unwrap_or(standard),
            LikelihoodAdjustment::SelfTraining(sfe) => sfe.adjust(feature, label, standard),
        }
    }

    pub(crate) fn forget(&mut self, feature: Feature) {
        match self {
            LikelihoodAdjustment::Standard => {}
            LikelihoodAdjustment::FeatureMarginals(marginals) => marginals.forget(feature),
            LikelihoodAdjustment::SelfTraining(sfe) => sfe.forget(feature),
        }
    }
}
