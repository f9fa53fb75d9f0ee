use std::collections::HashSet;

use anyhow::{Context, Result};
use bayesem_classifiers::feature_selection::univariate_selection::SelectKBest;
use bayesem_classifiers::indexer::Indexer;
use bayesem_classifiers::io::read_documents;
use bayesem_classifiers::model_state::{ModelFile, SavedModel};
use bayesem_classifiers::semi_supervised::SemiSupervisedLearner;
use bayesem_classifiers::{Document, Feature, NaiveBayesClassifier};

use crate::commands::config::TrainConfig;

pub fn run_train(config: &TrainConfig) -> Result<ModelFile> {
    let mut features = Indexer::new();
    let mut labels = Indexer::new();
    let mut documents = read_documents(&config.train_data, &mut features, &mut labels)?;

    if config.min_feature_count.is_some() || config.select_k_best.is_some() {
        let keep = selected_features(config, &documents);
        log::info!("Keeping {} of {} features", keep.len(), features.len());
        for doc in documents.iter_mut() {
            doc.features.retain(|f| keep.contains(f));
        }
    }

    let learner = SemiSupervisedLearner::new(
        config.classifier.clone(),
        config.kind,
        config.em_iterations,
    );

    let model = if config.one_vs_rest {
        let ovr = learner.fit_one_vs_rest(&documents)?;
        log::info!("Trained {} one-vs-rest learners", ovr.learner_count());
        SavedModel::from_one_vs_rest(&ovr, &features, &labels)?
    } else {
        let classifier = learner.fit_documents(&documents)?;
        log::info!(
            "Trained {} classifier over {} labels",
            classifier.kind().name(),
            classifier.label_set().len()
        );
        SavedModel::from_classifier(&classifier, &features, &labels)?
    };

    let model_file = ModelFile {
        features,
        labels,
        model,
    };
    model_file
        .save_to_path(&config.model_path)
        .with_context(|| format!("Failed to write model: {}", config.model_path))?;
    log::info!("Saved model to {}", config.model_path);
    Ok(model_file)
}

/// Features that survive the count cutoff and the chi-squared selection,
/// both judged on the labelled rows. Features seen only in unlabelled rows
/// are dropped as well.
fn selected_features(config: &TrainConfig, documents: &[Document]) -> HashSet<Feature> {
    let mut supervised = NaiveBayesClassifier::new(config.classifier.clone());
    supervised.train(documents);

    if let Some(cutoff) = config.min_feature_count {
        supervised.trim_infrequent_features(cutoff);
    }
    match config.select_k_best {
        Some(k) => SelectKBest::new(k)
            .fit(supervised.tables())
            .into_iter()
            .collect(),
        None => supervised.vocabulary().clone(),
    }
}
