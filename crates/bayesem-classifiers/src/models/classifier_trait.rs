use crate::data_handling::{Feature, Label, LabelDistribution};
use crate::error::{ClassifierError, Result};
use crate::math::argmax;

/// Inference contract shared by every classifier in the crate.
///
/// `Sync` is required so the EM expectation step and one-vs-rest composition
/// can fan documents out across threads against a shared reference.
pub trait Classifier: Send + Sync {
    /// Every label the classifier can assign probability to.
    fn labels(&self) -> Vec<Label>;

    /// Posterior over the full label set, summing to one. Features the
    /// classifier has never seen contribute no evidence.
    fn predict(&self, features: &[Feature]) -> Result<LabelDistribution>;

    /// Most probable label.
    fn best_label(&self, features: &[Feature]) -> Result<Label> {
        let posterior = self.predict(features)?;
        argmax(&posterior).ok_or(ClassifierError::NoLabels)
    }

    /// Optional human readable name for the classifier
    fn name(&self) -> &str {
        "classifier"
    }
}
