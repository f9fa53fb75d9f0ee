//! Gold-standard evaluation and seeded cross-validation.
use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use crate::data_handling::{Document, Label};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::Classifier;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Number of gold documents with this label
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub total: usize,
    pub correct: usize,
    pub per_label: BTreeMap<Label, LabelMetrics>,
    /// `(gold, predicted) -> count`
    #[serde(skip)]
    pub confusion: BTreeMap<(Label, Label), usize>,
}

impl Evaluation {
    fn from_pairs(labels: &[Label], pairs: &[(Label, Label)]) -> Self {
        let mut confusion: BTreeMap<(Label, Label), usize> = BTreeMap::new();
        for &pair in pairs {
            *confusion.entry(pair).or_insert(0) += 1;
        }
        let correct = pairs.iter().filter(|(gold, predicted)| gold == predicted).count();

        let per_label = labels
            .iter()
            .map(|&label| {
                let tp = confusion.get(&(label, label)).copied().unwrap_or(0) as f64;
                let support = pairs.iter().filter(|(gold, _)| *gold == label).count();
                let predicted = pairs.iter().filter(|(_, p)| *p == label).count();
                let precision = ratio(tp, predicted as f64);
                let recall = ratio(tp, support as f64);
                let f1 = ratio(2.0 * precision * recall, precision + recall);
                (
                    label,
                    LabelMetrics {
                        precision,
                        recall,
                        f1,
                        support,
                    },
                )
            })
            .collect();

        Self {
            total: pairs.len(),
            correct,
            per_label,
            confusion,
        }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct as f64, self.total as f64)
    }

    /// Unweighted mean F1 over labels with gold support.
    pub fn macro_f1(&self) -> f64 {
        let supported: Vec<f64> = self
            .per_label
            .values()
            .filter(|m| m.support > 0)
            .map(|m| m.f1)
            .collect();
        ratio(supported.iter().sum(), supported.len() as f64)
    }

    pub fn confusion_count(&self, gold: Label, predicted: Label) -> usize {
        self.confusion.get(&(gold, predicted)).copied().unwrap_or(0)
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Score `classifier` against the gold labels of `documents`. Unlabelled
/// documents are ignored.
///
/// # Errors
///
/// `UnknownLabel` if a gold label is outside the classifier's label set;
/// any prediction error is propagated.
pub fn evaluate<C: Classifier + ?Sized>(classifier: &C, documents: &[Document]) -> Result<Evaluation> {
    let labels = classifier.labels();
    let known: BTreeSet<Label> = labels.iter().copied().collect();

    let gold: Vec<(Label, &Document)> = documents
        .iter()
        .filter_map(|doc| doc.label.map(|label| (label, doc)))
        .collect();
    if let Some(&(label, _)) = gold.iter().find(|(label, _)| !known.contains(label)) {
        return Err(ClassifierError::UnknownLabel(label));
    }

    let pairs = gold
        .par_iter()
        .map(|&(label, doc)| Ok((label, classifier.best_label(&doc.features)?)))
        .collect::<Result<Vec<_>>>()?;

    let evaluation = Evaluation::from_pairs(&labels, &pairs);
    log::debug!(
        "Evaluated {} documents: accuracy {:.4}, macro F1 {:.4}",
        evaluation.total,
        evaluation.accuracy(),
        evaluation.macro_f1()
    );
    Ok(evaluation)
}

/// Split `documents` into `k` (train, test) folds.
///
/// Documents are grouped by gold label (unlabelled documents form their own
/// group), shuffled with a `seed`-ed RNG and dealt round-robin across folds,
/// so every label is spread as evenly as possible. Folds whose test side
/// would be empty are dropped.
pub fn k_fold(documents: &[Document], k: usize, seed: u64) -> Vec<(Vec<Document>, Vec<Document>)> {
    if k == 0 {
        return Vec::new();
    }
    let mut rng = StdRng::seed_from_u64(seed);

    let mut groups: BTreeMap<Option<Label>, Vec<usize>> = BTreeMap::new();
    for (i, doc) in documents.iter().enumerate() {
        groups.entry(doc.label).or_default().push(i);
    }

    let mut assignment = vec![0usize; documents.len()];
    let mut next = 0usize;
    for indices in groups.values_mut() {
        indices.shuffle(&mut rng);
        for &i in indices.iter() {
            assignment[i] = next % k;
            next += 1;
        }
    }

    (0..k)
        .filter_map(|fold| {
            let (test, train): (Vec<_>, Vec<_>) = documents
                .iter()
                .zip(&assignment)
                .partition(|(_, assigned)| **assigned == fold);
            if test.is_empty() {
                return None;
            }
            log::trace!(
                "Preparing fold {} with {} training and {} testing documents",
                fold,
                train.len(),
                test.len()
            );
            Some((
                train.into_iter().map(|(doc, _)| doc.clone()).collect(),
                test.into_iter().map(|(doc, _)| doc.clone()).collect(),
            ))
        })
        .collect()
}

/// Train one classifier per fold with `factory` and evaluate it on the
/// held-out documents.
pub fn cross_validate<C, F>(
    documents: &[Document],
    k: usize,
    seed: u64,
    factory: F,
) -> Result<Vec<Evaluation>>
where
    C: Classifier,
    F: Fn(&[Document]) -> Result<C>,
{
    k_fold(documents, k, seed)
        .into_iter()
        .enumerate()
        .map(|(fold, (train, test))| {
            log::info!(
                "Learning on Cross-Validation Fold: {} with {} training documents",
                fold,
                train.len()
            );
            let classifier = factory(&train)?;
            evaluate(&classifier, &test)
        })
        .collect()
}
