//! File round-trips: document TSV in, model JSON out and back, prediction
//! TSV out.
use std::fs;

use bayesem_classifiers::evaluation::evaluate;
use bayesem_classifiers::indexer::Indexer;
use bayesem_classifiers::io::{read_documents, write_predictions, Prediction};
use bayesem_classifiers::model_state::{ModelFile, RestoredModel, SavedModel};
use bayesem_classifiers::semi_supervised::SemiSupervisedLearner;
use bayesem_classifiers::{Classifier, ClassifierConfig, ClassifierKind};

const TRAINING: &str = "id\tlabel\tfeatures
d1\tsports\tball goal team
d2\tsports\tteam coach goal
d3\tpolitics\tvote party election
d4\tpolitics\tparty debate vote
d5\t\tball team crowd
d6\t-1\tvote debate senate
";

#[test]
fn trained_model_survives_a_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("train.tsv");
    fs::write(&input, TRAINING).unwrap();

    let mut features = Indexer::new();
    let mut labels = Indexer::new();
    let documents = read_documents(&input, &mut features, &mut labels).unwrap();
    assert_eq!(documents.len(), 6);
    assert_eq!(documents.iter().filter(|d| d.is_labelled()).count(), 4);

    let learner = SemiSupervisedLearner::new(
        ClassifierConfig::default(),
        ClassifierKind::SelfTrainingExpectation,
        2,
    );
    let classifier = learner.fit_documents(&documents).unwrap();

    let model_path = dir.path().join("model.json");
    ModelFile {
        model: SavedModel::from_classifier(&classifier, &features, &labels).unwrap(),
        features: features.clone(),
        labels: labels.clone(),
    }
    .save_to_path(&model_path)
    .unwrap();

    let mut loaded = ModelFile::load_from_path(&model_path).unwrap();
    assert_eq!(loaded.features, features);
    let restored = match loaded.restore().unwrap() {
        RestoredModel::Single(restored) => restored,
        RestoredModel::OneVsRest(_) => panic!("expected a single classifier"),
    };
    assert_eq!(restored, classifier);

    let crowd = loaded.features.get("crowd").unwrap();
    let senate = loaded.features.get("senate").unwrap();
    let frozen = RestoredModel::Single(restored).precompute();
    assert_eq!(
        frozen.best_label(&[crowd]).unwrap(),
        labels.get("sports").unwrap()
    );
    assert_eq!(
        frozen.best_label(&[senate]).unwrap(),
        labels.get("politics").unwrap()
    );
    assert_eq!(evaluate(&*frozen, &documents).unwrap().accuracy(), 1.0);
}

#[test]
fn predictions_are_written_with_label_names() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("predictions.tsv");
    let labels: Indexer = ["sports", "politics"].into_iter().collect();
    let predictions = vec![
        Prediction {
            id: "d5".to_string(),
            best_label: 0,
            distribution: [(0, 0.9), (1, 0.1)].into_iter().collect(),
        },
        Prediction {
            id: "d6".to_string(),
            best_label: 1,
            distribution: [(0, 0.2), (1, 0.8)].into_iter().collect(),
        },
    ];
    write_predictions(&output, &predictions, &[0, 1], &labels).unwrap();

    let written = fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines[0], "id\tbest_label\tsports\tpolitics");
    assert_eq!(lines[1], "d5\tsports\t0.900000\t0.100000");
    assert_eq!(lines[2], "d6\tpolitics\t0.200000\t0.800000");
}

#[test]
fn missing_input_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.tsv");
    let err = read_documents(&missing, &mut Indexer::new(), &mut Indexer::new()).unwrap_err();
    assert!(format!("{:#}", err).contains("absent.tsv"));
}
