//! Semi-supervised training driver.
//!
//! Starts from a labelled-only classifier, runs a fixed number of EM rounds
//! over the unlabelled pool and finally fits the likelihood adjustment of the
//! requested [`ClassifierKind`].
use crate::config::{ClassifierConfig, ClassifierKind};
use crate::data_handling::{partition_labelled, Document};
use crate::error::Result;
use crate::models::naive_bayes::NaiveBayesClassifier;
use crate::models::one_vs_rest::OneVsRest;

#[derive(Debug, Clone, Default)]
pub struct SemiSupervisedLearner {
    config: ClassifierConfig,
    kind: ClassifierKind,
    em_iterations: usize,
}

impl SemiSupervisedLearner {
    /// Create a new SemiSupervisedLearner
    ///
    /// # Arguments
    ///
    /// * `config` - Smoothing constants, solver limits and EM weight
    /// * `kind` - Likelihood adjustment fitted after EM
    /// * `em_iterations` - Number of EM rounds; 0 trains on labelled data only
    pub fn new(config: ClassifierConfig, kind: ClassifierKind, em_iterations: usize) -> Self {
        Self {
            config,
            kind,
            em_iterations,
        }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn kind(&self) -> ClassifierKind {
        self.kind
    }

    pub fn em_iterations(&self) -> usize {
        self.em_iterations
    }

    /// Train on a mixed pool, splitting it by the presence of a gold label.
    pub fn fit_documents(&self, documents: &[Document]) -> Result<NaiveBayesClassifier> {
        let (labelled, unlabelled) = partition_labelled(documents);
        self.fit(&labelled, &unlabelled)
    }

    /// Each EM round starts again from the labelled-only counts and adds the
    /// soft counts that the previous round's classifier assigns to
    /// `unlabelled`.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for degenerate smoothing constants; `NotBinary` when
    /// the feature-marginals kind meets a problem that does not have exactly
    /// two labels.
    pub fn fit(
        &self,
        labelled: &[Document],
        unlabelled: &[Document],
    ) -> Result<NaiveBayesClassifier> {
        log::info!(
            "Training {} classifier on {} labelled and {} unlabelled documents",
            self.kind.name(),
            labelled.len(),
            unlabelled.len()
        );
        let mut base = NaiveBayesClassifier::try_new(self.config.clone())?;
        base.train(labelled);

        let mut current = base.clone();
        if !current.label_set().is_empty() && !unlabelled.is_empty() {
            for round in 0..self.em_iterations {
                let mut next = base.clone();
                next.em_train_with(unlabelled, None, &current)?;
                let changed = unlabelled
                    .iter()
                    .filter(|doc| !doc.features.is_empty())
                    .filter(|doc| {
                        current.best_label(&doc.features).ok() != next.best_label(&doc.features).ok()
                    })
                    .count();
                log::info!(
                    "EM round {}/{}: {} unlabelled documents changed label",
                    round + 1,
                    self.em_iterations,
                    changed
                );
                current = next;
                if changed == 0 && round > 0 {
                    log::info!("EM converged after {} rounds", round + 1);
                    break;
                }
            }
        } else if self.em_iterations > 0 {
            log::warn!("Skipping EM: need labelled and unlabelled documents");
        }

        match self.kind {
            ClassifierKind::Standard => {}
            ClassifierKind::FeatureMarginals => current.fit_feature_marginals(unlabelled)?,
            ClassifierKind::SelfTrainingExpectation => {
                current.fit_self_training(labelled, unlabelled)
            }
        }
        Ok(current)
    }

    /// One-vs-rest composition whose per-label learners are all trained
    /// by this driver.
    pub fn fit_one_vs_rest(&self, documents: &[Document]) -> Result<OneVsRest<NaiveBayesClassifier>> {
        OneVsRest::train(documents, |relabelled: &[Document]| {
            self.fit_documents(relabelled)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassifierError;

    fn labelled() -> Vec<Document> {
        vec![
            Document::labelled(0, vec![1, 2]),
            Document::labelled(1, vec![3, 4]),
        ]
    }

    fn unlabelled() -> Vec<Document> {
        let mut docs = Vec::new();
        for _ in 0..10 {
            docs.push(Document::unlabelled(vec![1, 5]));
            docs.push(Document::unlabelled(vec![3, 6]));
        }
        docs
    }

    #[test]
    fn test_em_learns_unlabelled_only_features() {
        let supervised = SemiSupervisedLearner::new(ClassifierConfig::default(), ClassifierKind::Standard, 0)
            .fit(&labelled(), &unlabelled())
            .unwrap();
        // Feature 6 is unknown without EM: the tie goes to the smallest label.
        assert_eq!(supervised.best_label(&[6]).unwrap(), 0);

        let learner = SemiSupervisedLearner::new(ClassifierConfig::default(), ClassifierKind::Standard, 3);
        let classifier = learner.fit(&labelled(), &unlabelled()).unwrap();
        assert_eq!(classifier.best_label(&[6]).unwrap(), 1);
        assert_eq!(classifier.best_label(&[5]).unwrap(), 0);
    }

    #[test]
    fn test_fit_documents_partitions_pool() {
        let mut pool = labelled();
        pool.extend(unlabelled());
        let learner = SemiSupervisedLearner::new(ClassifierConfig::default(), ClassifierKind::Standard, 1);
        let from_pool = learner.fit_documents(&pool).unwrap();
        let direct = learner.fit(&labelled(), &unlabelled()).unwrap();
        assert_eq!(from_pool, direct);
    }

    #[test]
    fn test_kind_selects_adjustment() {
        for kind in [ClassifierKind::FeatureMarginals, ClassifierKind::SelfTrainingExpectation] {
            let classifier = SemiSupervisedLearner::new(ClassifierConfig::default(), kind, 1)
                .fit(&labelled(), &unlabelled())
                .unwrap();
            assert_eq!(classifier.kind(), kind);
        }
    }

    #[test]
    fn test_feature_marginals_needs_binary_problem_unless_one_vs_rest() {
        let mut pool = labelled();
        pool.push(Document::labelled(2, vec![7, 8]));
        pool.extend(unlabelled());
        let learner = SemiSupervisedLearner::new(ClassifierConfig::default(), ClassifierKind::FeatureMarginals, 1);
        assert!(matches!(
            learner.fit_documents(&pool),
            Err(ClassifierError::NotBinary { labels: 3 })
        ));

        let ovr = learner.fit_one_vs_rest(&pool).unwrap();
        assert_eq!(ovr.learner_count(), 3);
        assert_eq!(ovr.best_label(&[7, 8]).unwrap(), 2);
    }
}
