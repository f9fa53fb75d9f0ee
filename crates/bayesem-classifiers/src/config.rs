use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{ClassifierError, Result};

/// Central configuration for the Naive Bayes classifiers in the crate.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Additive constant on every label prior numerator.
    pub label_smoothing: f64,
    /// Additive constant on every feature likelihood numerator.
    pub feature_smoothing: f64,
    /// When false, every label receives the same empirical term of 1 and the
    /// priors are driven purely by smoothing, alphas and multipliers.
    pub empirical_label_priors: bool,
    /// Evaluation cap for the feature-marginals root finder.
    pub max_newton_raphson_evaluations: usize,
    /// Absolute accuracy at which the root finder stops.
    pub newton_raphson_accuracy: f64,
    /// Weight applied to unlabelled evidence during EM.
    pub em_weight: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            label_smoothing: 5.0,
            feature_smoothing: 1.0,
            empirical_label_priors: true,
            max_newton_raphson_evaluations: 1_000_000,
            newton_raphson_accuracy: 1e-6,
            em_weight: 0.1,
        }
    }
}

impl ClassifierConfig {
    pub fn new(label_smoothing: f64, feature_smoothing: f64) -> Self {
        Self {
            label_smoothing,
            feature_smoothing,
            ..Self::default()
        }
    }

    pub fn with_empirical_label_priors(mut self, enabled: bool) -> Self {
        self.empirical_label_priors = enabled;
        self
    }

    /// Check the constants every estimate relies on: `feature_smoothing`
    /// must be positive so no likelihood is zero, `label_smoothing` and
    /// `em_weight` non-negative, and the solver accuracy positive.
    pub fn validate(&self) -> Result<()> {
        let invalid = |field: &'static str, value: f64| ClassifierError::InvalidConfig {
            field,
            value,
        };
        if !(self.feature_smoothing.is_finite() && self.feature_smoothing > 0.0) {
            return Err(invalid("feature_smoothing", self.feature_smoothing));
        }
        if !(self.label_smoothing.is_finite() && self.label_smoothing >= 0.0) {
            return Err(invalid("label_smoothing", self.label_smoothing));
        }
        if !(self.em_weight.is_finite() && self.em_weight >= 0.0) {
            return Err(invalid("em_weight", self.em_weight));
        }
        if !(self.newton_raphson_accuracy.is_finite() && self.newton_raphson_accuracy > 0.0) {
            return Err(invalid("newton_raphson_accuracy", self.newton_raphson_accuracy));
        }
        Ok(())
    }
}

/// Supported likelihood strategies.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Plain smoothed multinomial likelihoods.
    #[default]
    Standard,
    /// Lucas & Downey feature-marginals constrained likelihoods (binary only).
    FeatureMarginals,
    /// Self-training feature expectation correction.
    SelfTrainingExpectation,
}

impl ClassifierKind {
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierKind::Standard => "standard",
            ClassifierKind::FeatureMarginals => "feature-marginals",
            ClassifierKind::SelfTrainingExpectation => "sfe",
        }
    }
}

impl FromStr for ClassifierKind {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "standard" | "nb" => Ok(ClassifierKind::Standard),
            "feature-marginals" | "feature_marginals" | "fm" => {
                Ok(ClassifierKind::FeatureMarginals)
            }
            "sfe" | "self-training" | "self_training_expectation" => {
                Ok(ClassifierKind::SelfTrainingExpectation)
            }
            _ => Err(ClassifierError::UnknownKind(s.to_string())),
        }
    }
}
