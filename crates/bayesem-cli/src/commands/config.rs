use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use bayesem_classifiers::{ClassifierConfig, ClassifierKind};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};

use crate::commands::util::validate_document_file;

/// Settings for `bayesem train`, read from JSON with command line overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrainConfig {
    pub train_data: String,
    pub model_path: String,
    pub kind: ClassifierKind,
    /// EM rounds over the unlabelled rows; 0 trains on labelled rows only.
    pub em_iterations: usize,
    /// Decompose into one binary learner per label.
    pub one_vs_rest: bool,
    /// Drop features whose total count is below this cutoff before training.
    pub min_feature_count: Option<f64>,
    /// Keep only the k features with the highest chi-squared statistic.
    pub select_k_best: Option<usize>,
    pub classifier: ClassifierConfig,
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig {
            train_data: String::new(),
            model_path: String::from("bayesem_model.json"),
            kind: ClassifierKind::Standard,
            em_iterations: 0,
            one_vs_rest: false,
            min_feature_count: None,
            select_k_best: None,
            classifier: ClassifierConfig::default(),
        }
    }
}

pub fn load_train_config<P: AsRef<Path>>(path: P) -> Result<TrainConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: TrainConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

impl TrainConfig {
    pub fn from_arguments(config_path: Option<&Path>, matches: &ArgMatches) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => load_train_config(path)?,
            None => TrainConfig::default(),
        };

        // Apply CLI overrides
        if let Some(train_data) = matches.get_one::<String>("train_data") {
            config.train_data = train_data.clone();
        }
        validate_document_file(&config.train_data)?;

        // `evaluate` has no model_path argument
        if let Ok(Some(model_path)) = matches.try_get_one::<String>("model_path") {
            config.model_path = model_path.clone();
        }

        if let Some(kind) = matches.get_one::<String>("kind") {
            config.kind = ClassifierKind::from_str(kind)?;
        }

        if let Some(em_iterations) = matches.get_one::<usize>("em_iterations") {
            config.em_iterations = *em_iterations;
        }

        if matches.get_flag("one_vs_rest") {
            config.one_vs_rest = true;
        }

        config.classifier.validate()?;

        Ok(config)
    }
}
