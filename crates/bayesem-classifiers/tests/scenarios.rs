//! End-to-end behaviour of the classifier core: separable training data,
//! silent skips, EM count conservation, pseudo-count pinning, pruning,
//! one-vs-rest composition and the feature-marginals fallback.
use std::collections::HashSet;

use bayesem_classifiers::data_handling::feature_marginals;
use bayesem_classifiers::math::{DifferentiableFunction, NewtonRaphsonSolver};
use bayesem_classifiers::models::feature_marginals::{FeatureMarginals, FeatureMarginalsConstraint};
use bayesem_classifiers::{
    Classifier, ClassifierConfig, Document, NaiveBayesClassifier, OneVsRest,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ---------------------------------------------------------------------------
// Training and prediction
// ---------------------------------------------------------------------------

#[test]
fn separable_labels_are_predicted_confidently() {
    init_logging();
    let mut docs = Vec::new();
    for _ in 0..10 {
        docs.push(Document::labelled(0, vec![1, 2, 3]));
        docs.push(Document::labelled(1, vec![4, 5, 6]));
    }
    let mut classifier = NaiveBayesClassifier::default();
    classifier.train(&docs);

    let posterior = classifier.predict(&[1, 3]).unwrap();
    assert!(posterior[&0] > 0.9);
    assert_eq!(classifier.best_label(&[1, 3]).unwrap(), 0);
}

#[test]
fn unlabelled_instance_changes_nothing() {
    let mut classifier = NaiveBayesClassifier::default();
    classifier.train(&[Document::labelled(0, vec![1]), Document::labelled(1, vec![2])]);
    let before = classifier.clone();
    classifier.train_on_instance(None, &[1, 2, 3], 1.0, 1.0);
    assert_eq!(classifier, before);
}

#[test]
fn em_increases_doc_counts_by_weighted_posteriors() {
    let mut e_step = NaiveBayesClassifier::default();
    e_step.train(&[
        Document::labelled(0, vec![1, 2]),
        Document::labelled(1, vec![3]),
        Document::labelled(2, vec![4, 4]),
    ]);
    let mut learner = NaiveBayesClassifier::default();
    learner.train(&[Document::labelled(0, vec![1]), Document::labelled(1, vec![3])]);
    let before = learner.clone();

    let unlabelled = vec![
        Document::unlabelled(vec![1, 3]),
        Document::unlabelled(vec![4]),
        Document::unlabelled(vec![2, 9]),
    ];
    learner.em_train_with(&unlabelled, Some(0.3), &e_step).unwrap();

    for label in [0, 1, 2] {
        let expected: f64 = unlabelled
            .iter()
            .map(|doc| 0.3 * e_step.predict(&doc.features).unwrap()[&label])
            .sum();
        let increase = learner.tables().doc_count(label) - before.tables().doc_count(label);
        assert!((increase - expected).abs() < 1e-9, "label {}", label);
    }
}

#[test]
fn feature_alpha_pins_likelihood_without_real_counts() {
    let mut classifier = NaiveBayesClassifier::with_labels(ClassifierConfig::default(), [0, 1]);
    classifier.set_feature_alpha(10, 0, 2.0);
    classifier.set_feature_alpha(11, 1, 4.0);
    classifier.set_feature_alpha(12, 1, 1.0);
    let vocabulary = classifier.vocabulary().len() as f64;
    assert_eq!(vocabulary, 3.0);
    // (featureSmoothing + alpha) / (alpha total + featureSmoothing * |V| + 0)
    let expected = (1.0 + 2.0) / (2.0 + 1.0 * vocabulary);
    assert!((classifier.feature_likelihood(10, 0) - expected).abs() < 1e-12);
    let expected = (1.0 + 4.0) / (5.0 + 1.0 * vocabulary);
    assert!((classifier.feature_likelihood(11, 1) - expected).abs() < 1e-12);
}

#[test]
fn trimmed_features_leave_no_trace() {
    let mut classifier = NaiveBayesClassifier::default();
    classifier.train(&[
        Document::labelled(0, vec![1, 1, 1, 2, 3]),
        Document::labelled(1, vec![1, 4, 4, 4, 5]),
    ]);
    classifier.set_feature_alpha(5, 0, 1.5);
    let pruned: HashSet<u32> = classifier.infrequent_features(2.0).into_iter().collect();
    assert_eq!(pruned, [2, 3].into_iter().collect());

    classifier.trim_infrequent_features(2.0);
    for feature in pruned {
        assert!(!classifier.vocabulary().contains(&feature));
        assert!(!classifier.tables().references_feature(feature));
    }
    assert!(classifier.vocabulary().contains(&5));
}

// ---------------------------------------------------------------------------
// One-vs-rest
// ---------------------------------------------------------------------------

#[test]
fn one_vs_rest_outputs_exactly_the_original_labels() {
    let mut docs = Vec::new();
    for label in [3u32, 5, 8, 13] {
        for _ in 0..3 {
            docs.push(Document::labelled(label, vec![label * 10, label * 10 + 1]));
        }
    }
    let ovr = OneVsRest::train(&docs, |d: &[Document]| {
        let mut classifier = NaiveBayesClassifier::default();
        classifier.train(d);
        Ok(classifier)
    })
    .unwrap();

    assert_eq!(Classifier::labels(&ovr), vec![3, 5, 8, 13]);
    for features in [vec![30], vec![130, 131], vec![999], vec![]] {
        let posterior = ovr.predict(&features).unwrap();
        assert_eq!(posterior.keys().copied().collect::<Vec<_>>(), vec![3, 5, 8, 13]);
        assert!((posterior.values().sum::<f64>() - 1.0).abs() < 1e-9);
    }
    assert_eq!(ovr.best_label(&[80, 81]).unwrap(), 8);
}

// ---------------------------------------------------------------------------
// Feature marginals fallback
// ---------------------------------------------------------------------------

fn no_root_constraint() -> FeatureMarginalsConstraint {
    FeatureMarginalsConstraint {
        word_given_positive: 0.0,
        not_word_given_positive: 10.0,
        word_given_negative: 5.0,
        not_word_given_negative: 5.0,
        l: 1.0,
        k: 0.5,
    }
}

#[test]
fn constraint_without_root_is_negative_across_interval() {
    let constraint = no_root_constraint();
    for i in 1..100 {
        let theta = 0.5 * i as f64 / 100.0;
        assert!(constraint.value(theta) < 0.0);
    }
    let solver = NewtonRaphsonSolver::default();
    match solver.solve(1_000, &constraint, 0.0, 0.5) {
        Ok(theta) => assert!(!(theta > 0.0 && theta < 0.5), "unexpected root {}", theta),
        Err(_) => {}
    }
}

#[test]
fn word_without_admissible_root_falls_back_to_standard_likelihood() {
    init_logging();
    let labelled = vec![
        Document::labelled(0, vec![1, 1, 2, 2, 3, 3, 4, 4, 5, 5]),
        Document::labelled(1, vec![9, 9, 9, 9, 9, 6, 6, 6, 6, 6]),
    ];
    let unlabelled = vec![Document::unlabelled(vec![9, 7, 7, 7])];

    let mut classifier = NaiveBayesClassifier::default();
    classifier.train(&labelled);
    let marginals = FeatureMarginals::estimate(
        classifier.tables(),
        &feature_marginals(&unlabelled),
        classifier.config(),
    )
    .unwrap();
    assert!(!marginals.contains(9));

    classifier.fit_feature_marginals(&unlabelled).unwrap();
    for label in [0, 1] {
        let standard = classifier.estimator().log_feature_likelihood(9, label);
        assert_eq!(classifier.log_likelihood(9, label), standard);
    }
}

#[test]
fn self_training_falls_back_for_words_never_seen_unlabelled() {
    let labelled = vec![
        Document::labelled(0, vec![1, 2]),
        Document::labelled(1, vec![2, 3]),
    ];
    let mut classifier = NaiveBayesClassifier::default();
    classifier.train(&labelled);
    classifier.fit_self_training(&labelled, &[Document::unlabelled(vec![1, 2])]);
    for label in [0, 1] {
        let standard = classifier.estimator().log_feature_likelihood(3, label);
        assert_eq!(classifier.log_likelihood(3, label), standard);
        let corrected = classifier.log_likelihood(1, label);
        assert_ne!(corrected, classifier.estimator().log_feature_likelihood(1, label));
    }
}
