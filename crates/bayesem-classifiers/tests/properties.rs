//! Property tests over randomly generated corpora: every prediction is a
//! probability distribution, the best label is its argmax, and a
//! precomputed snapshot ranks labels exactly like its source.
use proptest::prelude::*;

use bayesem_classifiers::{ClassifierConfig, Document, NaiveBayesClassifier};

fn corpus() -> impl Strategy<Value = Vec<Document>> {
    prop::collection::vec(
        (0u32..4, prop::collection::vec(0u32..20, 0..8)),
        1..30,
    )
    .prop_map(|docs| {
        docs.into_iter()
            .map(|(label, features)| Document::labelled(label, features))
            .collect()
    })
}

fn alphas() -> impl Strategy<Value = Vec<(u32, u32, f64)>> {
    prop::collection::vec((0u32..25, 0u32..4, 0.0f64..20.0), 0..5)
}

fn query() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..25, 0..10)
}

fn build(docs: &[Document], alphas: &[(u32, u32, f64)], empirical: bool) -> NaiveBayesClassifier {
    let config = ClassifierConfig::default().with_empirical_label_priors(empirical);
    let mut classifier = NaiveBayesClassifier::new(config);
    classifier.train(docs);
    for &(feature, label, alpha) in alphas {
        classifier.set_feature_alpha(feature, label, alpha);
    }
    classifier
}

proptest! {
    #[test]
    fn prop_predict_is_a_distribution(
        docs in corpus(),
        alphas in alphas(),
        empirical in any::<bool>(),
        features in query(),
    ) {
        let classifier = build(&docs, &alphas, empirical);
        if classifier.label_set().is_empty() {
            prop_assert!(classifier.predict(&features).is_err());
            return Ok(());
        }
        let posterior = classifier.predict(&features).unwrap();
        prop_assert_eq!(posterior.len(), classifier.label_set().len());
        for &p in posterior.values() {
            prop_assert!((0.0..=1.0).contains(&p));
        }
        let total: f64 = posterior.values().sum();
        prop_assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn prop_best_label_is_argmax(
        docs in corpus(),
        alphas in alphas(),
        features in query(),
    ) {
        let classifier = build(&docs, &alphas, true);
        prop_assume!(!classifier.label_set().is_empty());
        let posterior = classifier.predict(&features).unwrap();
        let best = classifier.best_label(&features).unwrap();
        let max = posterior.values().copied().fold(f64::NEG_INFINITY, f64::max);
        prop_assert!((posterior[&best] - max).abs() < 1e-12);
    }

    #[test]
    fn prop_precomputed_matches_source(
        docs in corpus(),
        alphas in alphas(),
        features in query(),
    ) {
        let classifier = build(&docs, &alphas, true);
        prop_assume!(!classifier.label_set().is_empty());
        let snapshot = classifier.precompute();
        let expected = classifier.log_scores(&features).unwrap();
        let actual = snapshot.log_scores(&features).unwrap();
        prop_assert_eq!(expected.len(), actual.len());
        for (label, score) in &expected {
            prop_assert!((actual[label] - score).abs() <= 1e-9 * score.abs().max(1.0));
        }
        prop_assert_eq!(snapshot.best_label(&features).unwrap(), classifier.best_label(&features).unwrap());
    }
}
