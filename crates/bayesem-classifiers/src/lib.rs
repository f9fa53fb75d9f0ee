//! bayesem-classifiers: steerable Naive Bayes text classifiers.
//!
//! This crate provides a counting multinomial Naive Bayes classifier with
//! pseudo-count ("alpha") steering, Expectation-Maximisation semi-supervised
//! training, a precomputed log-probability snapshot for bulk inference, the
//! feature-marginals and self-training feature-expectation likelihood
//! adjustments, and a one-vs-rest composer for multi-class problems.
//!
//! Documents arrive already featurised as integer ids; the [`indexer`] module
//! maps those ids to and from strings at the file and model boundaries.
pub mod config;
pub mod data_handling;
pub mod error;
pub mod evaluation;
pub mod feature_selection;
pub mod indexer;
pub mod io;
pub mod math;
pub mod model_state;
pub mod models;
pub mod semi_supervised;

pub use config::{ClassifierConfig, ClassifierKind};
pub use data_handling::{Document, Feature, Label, LabelDistribution};
pub use error::{ClassifierError, Result};
pub use models::classifier_trait::Classifier;
pub use models::naive_bayes::NaiveBayesClassifier;
pub use models::one_vs_rest::OneVsRest;
pub use models::precomputed::PrecomputedClassifier;
