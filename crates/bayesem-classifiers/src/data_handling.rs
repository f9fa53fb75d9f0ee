//! Data structures for featurised training documents.
//!
//! Features and labels are opaque integer ids handed over by the tokenising
//! pipeline. A `Document` is a multiset of features with an optional gold
//! label and a reference back to its source for traceability.
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Opaque feature identifier.
pub type Feature = u32;

/// Opaque class identifier.
pub type Label = u32;

/// Posterior distribution over the classifier's label set.
pub type LabelDistribution = BTreeMap<Label, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Gold label, `None` when the document is unlabelled
    pub label: Option<Label>,
    /// Feature occurrences; duplicates count
    pub features: Vec<Feature>,
    /// Source id or text reference, never used in computation
    pub source: Option<String>,
}

impl Document {
    pub fn labelled(label: Label, features: Vec<Feature>) -> Self {
        Self {
            label: Some(label),
            features,
            source: None,
        }
    }

    pub fn unlabelled(features: Vec<Feature>) -> Self {
        Self {
            label: None,
            features,
            source: None,
        }
    }

    pub fn with_source<S: Into<String>>(mut self, source: S) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn is_labelled(&self) -> bool {
        self.label.is_some()
    }

    /// The same document with its gold label removed.
    pub fn without_label(&self) -> Self {
        Self {
            label: None,
            features: self.features.clone(),
            source: self.source.clone(),
        }
    }
}

/// Split documents into (labelled, unlabelled) owned collections.
pub fn partition_labelled(documents: &[Document]) -> (Vec<Document>, Vec<Document>) {
    let (labelled, unlabelled): (Vec<&Document>, Vec<&Document>) =
        documents.iter().partition(|doc| doc.is_labelled());
    log::debug!(
        "Partitioned {} documents into {} labelled and {} unlabelled",
        documents.len(),
        labelled.len(),
        unlabelled.len()
    );
    (
        labelled.into_iter().cloned().collect(),
        unlabelled.into_iter().cloned().collect(),
    )
}

/// Marginal feature probabilities `P(w)` over all tokens of `documents`.
///
/// Labels are ignored; every token counts once. Returns an empty map when
/// the documents hold no tokens at all.
pub fn feature_marginals(documents: &[Document]) -> HashMap<Feature, f64> {
    let mut counts: HashMap<Feature, f64> = HashMap::new();
    let mut total = 0.0;
    for doc in documents {
        for &feature in &doc.features {
            *counts.entry(feature).or_insert(0.0) += 1.0;
            total += 1.0;
        }
    }
    if total > 0.0 {
        for value in counts.values_mut() {
            *value /= total;
        }
    }
    counts
}
