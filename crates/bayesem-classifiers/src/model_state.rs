//! Persisted classifier state.
//!
//! Every count and pseudo-count table is stored keyed by feature and label
//! *names*, resolved through the caller's [`Indexer`]s, so a saved model does
//! not depend on the id assignment of the pipeline that produced it. The
//! likelihood adjustment is an explicit tagged union; loading is a closed
//! match over the known kinds.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::data_handling::{Feature, Label};
use crate::error::{ClassifierError, Result};
use crate::indexer::Indexer;
use crate::models::adjustment::LikelihoodAdjustment;
use crate::models::classifier_trait::Classifier;
use crate::models::counts::CountTables;
use crate::models::feature_marginals::FeatureMarginals;
use crate::models::naive_bayes::NaiveBayesClassifier;
use crate::models::one_vs_rest::OneVsRest;
use crate::models::self_training::SelfTrainingExpectation;

type NamedCounts = BTreeMap<String, f64>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdjustmentState {
    Standard,
    FeatureMarginals {
        positive: String,
        negative: String,
        positive_probabilities: NamedCounts,
        negative_probabilities: NamedCounts,
    },
    SelfTraining {
        word_probabilities: NamedCounts,
        log_normalisers: NamedCounts,
    },
}

/// Complete state of one [`NaiveBayesClassifier`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelState {
    pub config: ClassifierConfig,
    /// Label names in ascending id order
    pub labels: Vec<String>,
    /// Vocabulary names in ascending id order
    pub vocabulary: Vec<String>,
    pub doc_counts: NamedCounts,
    pub label_feature_counts: NamedCounts,
    pub joint_counts: BTreeMap<String, NamedCounts>,
    pub label_pseudo_counts: NamedCounts,
    pub feature_pseudo_counts: BTreeMap<String, NamedCounts>,
    pub pseudo_count_totals: NamedCounts,
    pub label_multipliers: NamedCounts,
    pub adjustment: AdjustmentState,
}

impl ModelState {
    /// Externalise `classifier` through `features` and `labels`.
    ///
    /// # Errors
    ///
    /// `UnnamedId` if an id in the classifier has no name in its indexer.
    pub fn from_classifier(
        classifier: &NaiveBayesClassifier,
        features: &Indexer,
        labels: &Indexer,
    ) -> Result<Self> {
        let tables = classifier.tables();
        let label_name = |id: Label| name_of(labels, "label", id);
        let feature_name = |id: Feature| name_of(features, "feature", id);

        let mut vocabulary: Vec<Feature> = tables.vocabulary.iter().copied().collect();
        vocabulary.sort_unstable();

        let adjustment = match classifier.adjustment() {
            LikelihoodAdjustment::Standard => AdjustmentState::Standard,
            LikelihoodAdjustment::FeatureMarginals(marginals) => AdjustmentState::FeatureMarginals {
                positive: label_name(marginals.positive())?,
                negative: label_name(marginals.negative())?,
                positive_probabilities: externalise(
                    marginals.positive_probabilities(),
                    feature_name,
                )?,
                negative_probabilities: externalise(
                    marginals.negative_probabilities(),
                    feature_name,
                )?,
            },
            LikelihoodAdjustment::SelfTraining(sfe) => AdjustmentState::SelfTraining {
                word_probabilities: externalise(sfe.word_probabilities(), feature_name)?,
                log_normalisers: externalise(sfe.log_normalisers(), label_name)?,
            },
        };

        Ok(Self {
            config: classifier.config().clone(),
            labels: tables
                .labels
                .iter()
                .map(|&l| label_name(l))
                .collect::<Result<_>>()?,
            vocabulary: vocabulary
                .into_iter()
                .map(feature_name)
                .collect::<Result<_>>()?,
            doc_counts: externalise(&tables.doc_counts, label_name)?,
            label_feature_counts: externalise(&tables.label_feature_counts, label_name)?,
            joint_counts: externalise_nested(&tables.joint_counts, label_name, feature_name)?,
            label_pseudo_counts: externalise(&tables.label_pseudo_counts, label_name)?,
            feature_pseudo_counts: externalise_nested(
                &tables.feature_pseudo_counts,
                label_name,
                feature_name,
            )?,
            pseudo_count_totals: externalise(&tables.pseudo_count_totals, label_name)?,
            label_multipliers: externalise(&tables.label_multipliers, label_name)?,
            adjustment,
        })
    }

    /// Rebuild the classifier, registering names in `features` and `labels`.
    ///
    /// Label and vocabulary names are registered in their stored order, so
    /// loading into fresh indexers reproduces a dense id assignment.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if the stored config is degenerate; `UnknownName` if
    /// a label-keyed table mentions a label missing from the stored label
    /// list.
    pub fn into_classifier(
        &self,
        features: &mut Indexer,
        labels: &mut Indexer,
    ) -> Result<NaiveBayesClassifier> {
        self.config.validate()?;
        let label_set: BTreeSet<Label> = self
            .labels
            .iter()
            .map(|name| labels.get_or_insert(name))
            .collect();
        let vocabulary = self
            .vocabulary
            .iter()
            .map(|name| features.get_or_insert(name))
            .collect();

        let labels = &*labels;
        let label_id = |name: &str| {
            labels
                .get(name)
                .filter(|id| label_set.contains(id))
                .ok_or_else(|| ClassifierError::UnknownName(name.to_string()))
        };

        let mut feature_id = |name: &str| -> Result<Feature> { Ok(features.get_or_insert(name)) };
        let joint_counts = internalise_nested(&self.joint_counts, label_id, &mut feature_id)?;
        let feature_pseudo_counts =
            internalise_nested(&self.feature_pseudo_counts, label_id, &mut feature_id)?;

        let adjustment = match &self.adjustment {
            AdjustmentState::Standard => LikelihoodAdjustment::Standard,
            AdjustmentState::FeatureMarginals {
                positive,
                negative,
                positive_probabilities,
                negative_probabilities,
            } => LikelihoodAdjustment::FeatureMarginals(FeatureMarginals::from_parts(
                label_id(positive)?,
                label_id(negative)?,
                internalise(positive_probabilities, &mut feature_id)?,
                internalise(negative_probabilities, &mut feature_id)?,
            )),
            AdjustmentState::SelfTraining {
                word_probabilities,
                log_normalisers,
            } => LikelihoodAdjustment::SelfTraining(SelfTrainingExpectation::from_parts(
                internalise(word_probabilities, &mut feature_id)?,
                internalise(log_normalisers, label_id)?,
            )),
        };

        let tables = CountTables {
            labels: label_set.clone(),
            vocabulary,
            doc_counts: internalise(&self.doc_counts, label_id)?,
            label_feature_counts: internalise(&self.label_feature_counts, label_id)?,
            joint_counts,
            label_pseudo_counts: internalise(&self.label_pseudo_counts, label_id)?,
            feature_pseudo_counts,
            pseudo_count_totals: internalise(&self.pseudo_count_totals, label_id)?,
            label_multipliers: internalise(&self.label_multipliers, label_id)?,
        };

        Ok(NaiveBayesClassifier::from_parts(
            self.config.clone(),
            tables,
            adjustment,
        ))
    }
}

/// One binary learner of a persisted one-vs-rest composition.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OvrLearnerState {
    pub target: String,
    /// Inner state; its labels are `target` and `other`
    pub state: ModelState,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "composition", rename_all = "snake_case")]
pub enum SavedModel {
    Single { state: ModelState },
    OneVsRest { learners: Vec<OvrLearnerState> },
}

/// A reloaded model, still trainable.
#[derive(Debug, Clone)]
pub enum RestoredModel {
    Single(NaiveBayesClassifier),
    OneVsRest(OneVsRest<NaiveBayesClassifier>),
}

impl RestoredModel {
    /// Freeze into an immutable classifier for bulk inference.
    pub fn precompute(&self) -> Box<dyn Classifier> {
        match self {
            RestoredModel::Single(classifier) => Box::new(classifier.precompute()),
            RestoredModel::OneVsRest(ovr) => match ovr.single() {
                Some(classifier) => Box::new(classifier.precompute()),
                None => Box::new(OneVsRest::from_learners(
                    ovr.per_label()
                        .iter()
                        .map(|(label, learner)| (*label, learner.precompute()))
                        .collect(),
                )),
            },
        }
    }
}

/// Indexer naming the inner labels of one-vs-rest learners.
fn binary_labels() -> Indexer {
    ["target", "other"].into_iter().collect()
}

impl SavedModel {
    pub fn from_classifier(
        classifier: &NaiveBayesClassifier,
        features: &Indexer,
        labels: &Indexer,
    ) -> Result<Self> {
        Ok(SavedModel::Single {
            state: ModelState::from_classifier(classifier, features, labels)?,
        })
    }

    pub fn from_one_vs_rest(
        ovr: &OneVsRest<NaiveBayesClassifier>,
        features: &Indexer,
        labels: &Indexer,
    ) -> Result<Self> {
        if let Some(classifier) = ovr.single() {
            return Self::from_classifier(classifier, features, labels);
        }
        let binary = binary_labels();
        let learners = ovr
            .per_label()
            .iter()
            .map(|(target, learner)| {
                Ok(OvrLearnerState {
                    target: name_of(labels, "label", *target)?,
                    state: ModelState::from_classifier(learner, features, &binary)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SavedModel::OneVsRest { learners })
    }

    pub fn restore(&self, features: &mut Indexer, labels: &mut Indexer) -> Result<RestoredModel> {
        match self {
            SavedModel::Single { state } => {
                Ok(RestoredModel::Single(state.into_classifier(features, labels)?))
            }
            SavedModel::OneVsRest { learners } => {
                let mut binary = binary_labels();
                let learners = learners
                    .iter()
                    .map(|learner| {
                        let target = labels.get_or_insert(&learner.target);
                        Ok((target, learner.state.into_classifier(features, &mut binary)?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(RestoredModel::OneVsRest(OneVsRest::from_learners(learners)))
            }
        }
    }
}

/// A saved model bundled with the indexers it was trained against.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ModelFile {
    pub features: Indexer,
    pub labels: Indexer,
    pub model: SavedModel,
}

impl ModelFile {
    pub fn save<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(BufReader::new(File::open(path)?))
    }

    /// Restore the model against the bundled indexers.
    pub fn restore(&mut self) -> Result<RestoredModel> {
        self.model.restore(&mut self.features, &mut self.labels)
    }
}

fn name_of(indexer: &Indexer, kind: &'static str, id: u32) -> Result<String> {
    indexer
        .name(id)
        .map(str::to_string)
        .ok_or(ClassifierError::UnnamedId { kind, id })
}

fn externalise<'a, I, F>(entries: I, mut name: F) -> Result<NamedCounts>
where
    I: IntoIterator<Item = (&'a u32, &'a f64)>,
    F: FnMut(u32) -> Result<String>,
{
    entries
        .into_iter()
        .map(|(&id, &value)| Ok((name(id)?, value)))
        .collect()
}

fn externalise_nested<F, G>(
    tables: &BTreeMap<Label, HashMap<Feature, f64>>,
    mut label_name: F,
    mut feature_name: G,
) -> Result<BTreeMap<String, NamedCounts>>
where
    F: FnMut(Label) -> Result<String>,
    G: FnMut(Feature) -> Result<String>,
{
    tables
        .iter()
        .map(|(&label, counts)| Ok((label_name(label)?, externalise(counts, &mut feature_name)?)))
        .collect()
}

fn internalise<C, F>(entries: &NamedCounts, mut id: F) -> Result<C>
where
    C: FromIterator<(u32, f64)>,
    F: FnMut(&str) -> Result<u32>,
{
    entries
        .iter()
        .map(|(name, &value)| Ok((id(name)?, value)))
        .collect()
}

fn internalise_nested<F, G>(
    tables: &BTreeMap<String, NamedCounts>,
    mut label_id: F,
    mut feature_id: G,
) -> Result<BTreeMap<Label, HashMap<Feature, f64>>>
where
    F: FnMut(&str) -> Result<Label>,
    G: FnMut(&str) -> Result<Feature>,
{
    tables
        .iter()
        .map(|(name, counts)| Ok((label_id(name)?, internalise(counts, &mut feature_id)?)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_handling::Document;

    fn indexers() -> (Indexer, Indexer) {
        let features: Indexer = ["buy", "now", "meeting", "agenda", "free"]
            .into_iter()
            .collect();
        let labels: Indexer = ["spam", "ham"].into_iter().collect();
        (features, labels)
    }

    fn documents() -> Vec<Document> {
        vec![
            Document::labelled(0, vec![0, 1, 4, 0]),
            Document::labelled(0, vec![0, 4, 1]),
            Document::labelled(1, vec![2, 3, 1]),
            Document::labelled(1, vec![2, 3, 3]),
        ]
    }

    fn round_trip(classifier: &NaiveBayesClassifier) -> NaiveBayesClassifier {
        let (features, labels) = indexers();
        let file = ModelFile {
            model: SavedModel::from_classifier(classifier, &features, &labels).unwrap(),
            features,
            labels,
        };
        let mut buffer = Vec::new();
        file.save(&mut buffer).unwrap();
        let mut loaded = ModelFile::load(buffer.as_slice()).unwrap();
        assert_eq!(loaded, file);
        match loaded.restore().unwrap() {
            RestoredModel::Single(restored) => restored,
            RestoredModel::OneVsRest(_) => panic!("expected a single classifier"),
        }
    }

    #[test]
    fn test_standard_round_trip_is_exact() {
        let mut classifier = NaiveBayesClassifier::new(ClassifierConfig::new(2.5, 0.3));
        classifier.train(&documents());
        classifier.em_train(&[Document::unlabelled(vec![0, 2])], None).unwrap();
        classifier.set_feature_alpha(4, 1, 1.7);
        classifier.set_label_alpha(0, 0.2);
        classifier.set_label_multiplier(1, 3.0);
        assert_eq!(round_trip(&classifier), classifier);
    }

    #[test]
    fn test_self_training_round_trip_is_exact() {
        let mut classifier = NaiveBayesClassifier::default();
        let labelled = documents();
        classifier.train(&labelled);
        classifier.fit_self_training(&labelled, &[Document::unlabelled(vec![0, 1, 2])]);
        let restored = round_trip(&classifier);
        assert_eq!(restored, classifier);
        assert_eq!(restored.predict(&[0, 2]).unwrap(), classifier.predict(&[0, 2]).unwrap());
    }

    #[test]
    fn test_feature_marginals_round_trip_is_exact() {
        let mut classifier = NaiveBayesClassifier::default();
        classifier.train(&documents());
        classifier
            .fit_feature_marginals(&[
                Document::unlabelled(vec![0, 1, 2, 3]),
                Document::unlabelled(vec![1, 3, 4]),
            ])
            .unwrap();
        assert_eq!(round_trip(&classifier), classifier);
    }

    #[test]
    fn test_one_vs_rest_round_trip_predicts_identically() {
        let features: Indexer = ["a", "b", "c"].into_iter().collect();
        let labels: Indexer = ["x", "y", "z"].into_iter().collect();
        let docs = vec![
            Document::labelled(0, vec![0, 0]),
            Document::labelled(1, vec![1, 1]),
            Document::labelled(2, vec![2, 2]),
        ];
        let ovr = OneVsRest::train(&docs, |d: &[Document]| {
            let mut c = NaiveBayesClassifier::default();
            c.train(d);
            Ok(c)
        })
        .unwrap();
        let saved = SavedModel::from_one_vs_rest(&ovr, &features, &labels).unwrap();
        let restored = saved
            .restore(&mut features.clone(), &mut labels.clone())
            .unwrap()
            .precompute();
        assert_eq!(restored.labels(), vec![0, 1, 2]);
        for f in [vec![0], vec![1, 2], vec![]] {
            let expected = ovr.predict(&f).unwrap();
            let actual = restored.predict(&f).unwrap();
            for (label, p) in expected {
                assert!((actual[&label] - p).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_unnamed_id_is_rejected() {
        let mut classifier = NaiveBayesClassifier::default();
        classifier.train(&[Document::labelled(7, vec![0])]);
        let (features, labels) = indexers();
        let result = ModelState::from_classifier(&classifier, &features, &labels);
        assert!(matches!(
            result,
            Err(ClassifierError::UnnamedId { kind: "label", id: 7 })
        ));
    }

    #[test]
    fn test_unknown_label_name_is_rejected() {
        let mut classifier = NaiveBayesClassifier::default();
        classifier.train(&documents());
        let (features, labels) = indexers();
        let mut state = ModelState::from_classifier(&classifier, &features, &labels).unwrap();
        state.doc_counts.insert("eggs".to_string(), 1.0);
        let result = state.into_classifier(&mut Indexer::new(), &mut Indexer::new());
        assert!(matches!(result, Err(ClassifierError::UnknownName(name)) if name == "eggs"));
    }

    #[test]
    fn test_degenerate_stored_config_is_rejected() {
        let mut classifier = NaiveBayesClassifier::default();
        classifier.train(&documents());
        let (features, labels) = indexers();
        let mut state = ModelState::from_classifier(&classifier, &features, &labels).unwrap();
        state.config.feature_smoothing = 0.0;
        let result = state.into_classifier(&mut Indexer::new(), &mut Indexer::new());
        assert!(matches!(
            result,
            Err(ClassifierError::InvalidConfig { field: "feature_smoothing", .. })
        ));
    }
}
