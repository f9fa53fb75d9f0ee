//! Mutable frequency tables owned by the counting classifier.
//!
//! Real counts only ever grow through [`CountTables::add_instance`] and
//! [`CountTables::merge`]. Pseudo-counts are overwritten, never accumulated,
//! and the only way anything shrinks is explicit feature removal.
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::data_handling::{Feature, Label};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountTables {
    pub(crate) labels: BTreeSet<Label>,
    pub(crate) vocabulary: HashSet<Feature>,
    /// Weighted number of documents per label
    pub(crate) doc_counts: BTreeMap<Label, f64>,
    /// Weighted number of feature occurrences per label
    pub(crate) label_feature_counts: BTreeMap<Label, f64>,
    pub(crate) joint_counts: BTreeMap<Label, HashMap<Feature, f64>>,
    pub(crate) label_pseudo_counts: BTreeMap<Label, f64>,
    pub(crate) feature_pseudo_counts: BTreeMap<Label, HashMap<Feature, f64>>,
    /// Sum of `feature_pseudo_counts[label]`, kept in step with every write
    pub(crate) pseudo_count_totals: BTreeMap<Label, f64>,
    pub(crate) label_multipliers: BTreeMap<Label, f64>,
}

impl CountTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> &BTreeSet<Label> {
        &self.labels
    }

    pub fn vocabulary(&self) -> &HashSet<Feature> {
        &self.vocabulary
    }

    pub fn doc_count(&self, label: Label) -> f64 {
        self.doc_counts.get(&label).copied().unwrap_or(0.0)
    }

    pub fn label_feature_count(&self, label: Label) -> f64 {
        self.label_feature_counts.get(&label).copied().unwrap_or(0.0)
    }

    pub fn joint_count(&self, label: Label, feature: Feature) -> f64 {
        self.joint_counts
            .get(&label)
            .and_then(|counts| counts.get(&feature))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn label_pseudo_count(&self, label: Label) -> f64 {
        self.label_pseudo_counts.get(&label).copied().unwrap_or(0.0)
    }

    pub fn feature_pseudo_count(&self, label: Label, feature: Feature) -> f64 {
        self.feature_pseudo_counts
            .get(&label)
            .and_then(|counts| counts.get(&feature))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn pseudo_count_total(&self, label: Label) -> f64 {
        self.pseudo_count_totals.get(&label).copied().unwrap_or(0.0)
    }

    /// Prior multiplier for `label`, 1 unless set.
    pub fn label_multiplier(&self, label: Label) -> f64 {
        self.label_multipliers.get(&label).copied().unwrap_or(1.0)
    }

    pub fn add_label(&mut self, label: Label) {
        self.labels.insert(label);
    }

    /// Add `amount` to the document count of `label` and to the joint count of
    /// every feature occurrence.
    pub fn add_instance(&mut self, label: Label, features: &[Feature], amount: f64) {
        self.labels.insert(label);
        *self.doc_counts.entry(label).or_insert(0.0) += amount;

        let joint = self.joint_counts.entry(label).or_default();
        let mut added = 0.0;
        for &feature in features {
            self.vocabulary.insert(feature);
            *joint.entry(feature).or_insert(0.0) += amount;
            added += amount;
        }
        *self.label_feature_counts.entry(label).or_insert(0.0) += added;
    }

    /// Elementwise addition of `other`'s real counts; label and vocabulary
    /// sets are unioned. Pseudo-counts and multipliers of `other` are ignored.
    pub fn merge(&mut self, other: CountTables) {
        self.labels.extend(other.labels);
        self.vocabulary.extend(other.vocabulary);
        for (label, count) in other.doc_counts {
            *self.doc_counts.entry(label).or_insert(0.0) += count;
        }
        for (label, count) in other.label_feature_counts {
            *self.label_feature_counts.entry(label).or_insert(0.0) += count;
        }
        for (label, counts) in other.joint_counts {
            let joint = self.joint_counts.entry(label).or_default();
            for (feature, count) in counts {
                *joint.entry(feature).or_insert(0.0) += count;
            }
        }
    }

    pub fn set_label_pseudo_count(&mut self, label: Label, alpha: f64) {
        self.labels.insert(label);
        self.label_pseudo_counts.insert(label, alpha);
    }

    /// A zero `alpha` clears the pseudo-count instead, so the feature only
    /// stays in the vocabulary if something else references it.
    pub fn set_feature_pseudo_count(&mut self, feature: Feature, label: Label, alpha: f64) {
        self.labels.insert(label);
        if alpha <= 0.0 {
            self.clear_feature_pseudo_count(feature, label);
            return;
        }
        self.vocabulary.insert(feature);
        let previous = self
            .feature_pseudo_counts
            .entry(label)
            .or_default()
            .insert(feature, alpha)
            .unwrap_or(0.0);
        let total = self.pseudo_count_totals.entry(label).or_insert(0.0);
        *total = (*total - previous + alpha).max(0.0);
    }

    /// Drop the pseudo-count of `feature` under `label`. Returns true if the
    /// feature was also dropped from the vocabulary because nothing else
    /// references it.
    pub fn clear_feature_pseudo_count(&mut self, feature: Feature, label: Label) -> bool {
        let previous = self
            .feature_pseudo_counts
            .get_mut(&label)
            .and_then(|counts| counts.remove(&feature))
            .unwrap_or(0.0);
        if let Some(total) = self.pseudo_count_totals.get_mut(&label) {
            *total = (*total - previous).max(0.0);
        }
        if !self.has_presence(feature) {
            self.vocabulary.remove(&feature);
            return true;
        }
        false
    }

    pub fn set_label_multiplier(&mut self, label: Label, multiplier: f64) {
        self.labels.insert(label);
        self.label_multipliers.insert(label, multiplier);
    }

    /// True if any label holds a non-zero real or pseudo count for `feature`.
    pub fn has_presence(&self, feature: Feature) -> bool {
        self.labels.iter().any(|&label| {
            self.joint_count(label, feature) > 0.0 || self.feature_pseudo_count(label, feature) > 0.0
        })
    }

    /// Real plus pseudo count of `feature` summed over all labels.
    pub fn feature_total(&self, feature: Feature) -> f64 {
        self.labels
            .iter()
            .map(|&label| self.joint_count(label, feature) + self.feature_pseudo_count(label, feature))
            .sum()
    }

    /// Remove every trace of `feature`. Per-label totals shrink by the removed
    /// amounts, clamped at zero.
    pub fn remove_feature(&mut self, feature: Feature) {
        for (label, counts) in self.joint_counts.iter_mut() {
            if let Some(count) = counts.remove(&feature) {
                if let Some(total) = self.label_feature_counts.get_mut(label) {
                    *total = (*total - count).max(0.0);
                }
            }
        }
        for (label, counts) in self.feature_pseudo_counts.iter_mut() {
            if let Some(alpha) = counts.remove(&feature) {
                if let Some(total) = self.pseudo_count_totals.get_mut(label) {
                    *total = (*total - alpha).max(0.0);
                }
            }
        }
        self.vocabulary.remove(&feature);
    }

    /// True if the vocabulary or any real or pseudo count table still
    /// mentions `feature`.
    pub fn references_feature(&self, feature: Feature) -> bool {
        self.vocabulary.contains(&feature)
            || self.joint_counts.values().any(|c| c.contains_key(&feature))
            || self.feature_pseudo_counts.values().any(|c| c.contains_key(&feature))
    }
}
