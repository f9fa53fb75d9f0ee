pub mod adjustment;
pub mod classifier_trait;
pub mod counts;
pub mod estimator;
pub mod feature_marginals;
pub mod naive_bayes;
pub mod one_vs_rest;
pub mod precomputed;
pub mod self_training;
