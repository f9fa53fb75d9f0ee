//! One-vs-rest decomposition of a multi-class problem into binary learners.
use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::data_handling::{Document, Feature, Label, LabelDistribution};
use crate::error::{ClassifierError, Result};
use crate::math::argmax;
use crate::models::classifier_trait::Classifier;

/// Binary view of a document's label from the perspective of one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OvrTarget {
    Class(Label),
    Other,
}

impl OvrTarget {
    /// Label the inner learner sees for the target class.
    pub const TARGET_LABEL: Label = 0;
    /// Label the inner learner sees for every other class.
    pub const OTHER_LABEL: Label = 1;

    pub fn of(label: Label, target: Label) -> Self {
        if label == target {
            OvrTarget::Class(label)
        } else {
            OvrTarget::Other
        }
    }

    pub fn binary_label(self) -> Label {
        match self {
            OvrTarget::Class(_) => Self::TARGET_LABEL,
            OvrTarget::Other => Self::OTHER_LABEL,
        }
    }
}

#[derive(Debug, Clone)]
enum Composition<L> {
    /// Two labels or fewer: one learner sees the original labels.
    Direct(L),
    /// One binary learner per original label, in label order.
    PerLabel(Vec<(Label, L)>),
}

#[derive(Debug, Clone)]
pub struct OneVsRest<L> {
    labels: Vec<Label>,
    composition: Composition<L>,
}

impl<L: Classifier> OneVsRest<L> {
    /// Train over the labels present in `documents`.
    ///
    /// # Errors
    ///
    /// `NoLabels` when no document is labelled; otherwise the first error
    /// any learner's `factory` call returns.
    pub fn train<F>(documents: &[Document], factory: F) -> Result<Self>
    where
        F: Fn(&[Document]) -> Result<L> + Sync,
    {
        let labels: BTreeSet<Label> = documents.iter().filter_map(|doc| doc.label).collect();
        Self::train_with_labels(labels, documents, factory)
    }

    /// Train one learner per label in `labels`. Each learner sees every
    /// document, relabelled to [`OvrTarget::TARGET_LABEL`] or
    /// [`OvrTarget::OTHER_LABEL`]; unlabelled documents stay unlabelled.
    pub fn train_with_labels<F>(
        labels: BTreeSet<Label>,
        documents: &[Document],
        factory: F,
    ) -> Result<Self>
    where
        F: Fn(&[Document]) -> Result<L> + Sync,
    {
        if labels.is_empty() {
            return Err(ClassifierError::NoLabels);
        }
        let labels: Vec<Label> = labels.into_iter().collect();

        if labels.len() <= 2 {
            log::debug!("One-vs-rest over {} labels: single learner", labels.len());
            let learner = factory(documents)?;
            return Ok(Self {
                labels,
                composition: Composition::Direct(learner),
            });
        }

        log::info!("Training {} one-vs-rest learners", labels.len());
        let learners = labels
            .par_iter()
            .map(|&target| {
                let relabelled = relabel(documents, target);
                let learner = factory(&relabelled)?;
                log::debug!("One-vs-rest learner for label {} trained", target);
                Ok((target, learner))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            labels,
            composition: Composition::PerLabel(learners),
        })
    }

    /// Wrap a single learner that already sees the original labels.
    pub fn from_single(learner: L) -> Self {
        let labels = learner.labels();
        Self {
            labels,
            composition: Composition::Direct(learner),
        }
    }

    /// Reassemble per-label binary learners, e.g. after loading a model.
    pub fn from_learners(mut learners: Vec<(Label, L)>) -> Self {
        learners.sort_by_key(|(label, _)| *label);
        learners.dedup_by_key(|(label, _)| *label);
        Self {
            labels: learners.iter().map(|(label, _)| *label).collect(),
            composition: Composition::PerLabel(learners),
        }
    }

    /// The single delegate, when there are two labels or fewer.
    pub fn single(&self) -> Option<&L> {
        match &self.composition {
            Composition::Direct(learner) => Some(learner),
            Composition::PerLabel(_) => None,
        }
    }

    /// The per-label binary learners in label order; empty for a single
    /// delegate.
    pub fn per_label(&self) -> &[(Label, L)] {
        match &self.composition {
            Composition::Direct(_) => &[],
            Composition::PerLabel(learners) => learners,
        }
    }

    pub fn learner_count(&self) -> usize {
        match &self.composition {
            Composition::Direct(_) => 1,
            Composition::PerLabel(learners) => learners.len(),
        }
    }

    /// The binary learner trained for `label`, or the single delegate when
    /// there are two labels or fewer.
    pub fn learner(&self, label: Label) -> Option<&L> {
        match &self.composition {
            Composition::Direct(learner) => self.labels.contains(&label).then_some(learner),
            Composition::PerLabel(learners) => learners
                .iter()
                .find(|(target, _)| *target == label)
                .map(|(_, learner)| learner),
        }
    }

    /// Merge each learner's target probability into one distribution over
    /// the original labels, renormalised to sum to 1.
    pub fn predict(&self, features: &[Feature]) -> Result<LabelDistribution> {
        let learners = match &self.composition {
            Composition::Direct(learner) => return learner.predict(features),
            Composition::PerLabel(learners) if learners.is_empty() => {
                return Err(ClassifierError::NoLabels)
            }
            Composition::PerLabel(learners) => learners,
        };

        let mut merged = LabelDistribution::new();
        for (target, learner) in learners {
            let posterior = learner.predict(features)?;
            let p = posterior
                .get(&OvrTarget::TARGET_LABEL)
                .copied()
                .unwrap_or(0.0);
            merged.insert(*target, p);
        }

        let total: f64 = merged.values().sum();
        if total > 0.0 && total.is_finite() {
            merged.values_mut().for_each(|p| *p /= total);
        } else {
            let uniform = 1.0 / merged.len() as f64;
            merged.values_mut().for_each(|p| *p = uniform);
        }
        Ok(merged)
    }

    pub fn best_label(&self, features: &[Feature]) -> Result<Label> {
        argmax(&self.predict(features)?).ok_or(ClassifierError::NoLabels)
    }
}

fn relabel(documents: &[Document], target: Label) -> Vec<Document> {
    documents
        .iter()
        .map(|doc| Document {
            label: doc
                .label
                .map(|label| OvrTarget::of(label, target).binary_label()),
            features: doc.features.clone(),
            source: doc.source.clone(),
        })
        .collect()
}

impl<L: Classifier> Classifier for OneVsRest<L> {
    fn labels(&self) -> Vec<Label> {
        self.labels.clone()
    }

    fn predict(&self, features: &[Feature]) -> Result<LabelDistribution> {
        OneVsRest::predict(self, features)
    }

    fn best_label(&self, features: &[Feature]) -> Result<Label> {
        OneVsRest::best_label(self, features)
    }

    fn name(&self) -> &str {
        "one-vs-rest"
    }
}
