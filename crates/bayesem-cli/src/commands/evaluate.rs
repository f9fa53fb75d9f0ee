use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use bayesem_classifiers::evaluation::{cross_validate, evaluate, Evaluation, LabelMetrics};
use bayesem_classifiers::indexer::Indexer;
use bayesem_classifiers::io::read_documents;
use bayesem_classifiers::model_state::ModelFile;
use bayesem_classifiers::semi_supervised::SemiSupervisedLearner;
use serde::Serialize;

use crate::commands::config::TrainConfig;

/// Evaluation summary with label names resolved.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub documents: usize,
    pub accuracy: f64,
    pub macro_f1: f64,
    pub per_label: BTreeMap<String, LabelMetrics>,
}

impl EvaluationReport {
    pub fn new(evaluation: &Evaluation, labels: &Indexer) -> Self {
        let per_label = evaluation
            .per_label
            .iter()
            .map(|(&label, metrics)| {
                let name = labels
                    .name(label)
                    .map(str::to_string)
                    .unwrap_or_else(|| label.to_string());
                (name, *metrics)
            })
            .collect();
        EvaluationReport {
            documents: evaluation.total,
            accuracy: evaluation.accuracy(),
            macro_f1: evaluation.macro_f1(),
            per_label,
        }
    }
}

/// Score a saved model against the gold labels of `data_path`.
pub fn run_evaluate(model_path: &Path, data_path: &Path) -> Result<EvaluationReport> {
    let mut model_file = ModelFile::load_from_path(model_path)
        .with_context(|| format!("Failed to load model: {}", model_path.display()))?;
    let classifier = model_file.restore()?.precompute();
    let documents = read_documents(data_path, &mut model_file.features, &mut model_file.labels)?;

    let evaluation = evaluate(&*classifier, &documents)?;
    let report = EvaluationReport::new(&evaluation, &model_file.labels);
    log::info!(
        "Accuracy {:.4}, macro F1 {:.4} over {} documents",
        report.accuracy,
        report.macro_f1,
        report.documents
    );
    Ok(report)
}

/// Seeded k-fold cross-validation of the learner described by `config`.
pub fn run_cross_validation(config: &TrainConfig, folds: usize, seed: u64) -> Result<Vec<EvaluationReport>> {
    let mut features = Indexer::new();
    let mut labels = Indexer::new();
    let documents = read_documents(&config.train_data, &mut features, &mut labels)?;

    let learner = SemiSupervisedLearner::new(
        config.classifier.clone(),
        config.kind,
        config.em_iterations,
    );
    let evaluations = if config.one_vs_rest {
        cross_validate(&documents, folds, seed, |train| learner.fit_one_vs_rest(train))?
    } else {
        cross_validate(&documents, folds, seed, |train| learner.fit_documents(train))?
    };

    let reports: Vec<EvaluationReport> = evaluations
        .iter()
        .map(|evaluation| EvaluationReport::new(evaluation, &labels))
        .collect();
    for (fold, report) in reports.iter().enumerate() {
        log::info!(
            "Fold {}: accuracy {:.4}, macro F1 {:.4}",
            fold,
            report.accuracy,
            report.macro_f1
        );
    }
    Ok(reports)
}
