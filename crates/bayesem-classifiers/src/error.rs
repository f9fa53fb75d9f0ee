use thiserror::Error;

use crate::data_handling::Label;

/// Errors raised by the classifier core.
///
/// Silent-skip conditions (unlabelled documents, unknown prediction features,
/// a feature-marginal root that fails to converge) are not errors and never
/// surface here.
#[derive(Error, Debug)]
pub enum ClassifierError {
    /// Prediction requires at least one known label.
    #[error("classifier has no labels; train it or seed its label set first")]
    NoLabels,

    #[error("got {weights} weights for {documents} documents")]
    WeightLengthMismatch { documents: usize, weights: usize },

    /// A gold label that the classifier has never seen.
    #[error("label {0} is not in the classifier's label set")]
    UnknownLabel(Label),

    #[error("expected a binary problem, found {labels} labels")]
    NotBinary { labels: usize },

    #[error("root finder exceeded {max} evaluations")]
    TooManyEvaluations { max: usize },

    #[error("root finder produced a non-finite iterate after {evaluations} evaluations")]
    Diverged { evaluations: usize },

    #[error("invalid search interval [{min}, {max}]")]
    InvalidInterval { min: f64, max: f64 },

    /// An id with no name in the indexer used to externalise a model.
    #[error("{kind} id {id} has no name in the indexer")]
    UnnamedId { kind: &'static str, id: u32 },

    /// A name in a persisted model that the supplied indexer cannot resolve.
    #[error("unknown name in model state: {0}")]
    UnknownName(String),

    /// A configuration constant outside its admissible range.
    #[error("invalid classifier config: {field} = {value}")]
    InvalidConfig { field: &'static str, value: f64 },

    #[error("unknown classifier kind: {0}; expected one of standard, feature-marginals, sfe")]
    UnknownKind(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for classifier operations.
pub type Result<T> = std::result::Result<T, ClassifierError>;
