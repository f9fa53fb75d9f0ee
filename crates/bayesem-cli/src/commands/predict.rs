use std::path::Path;

use anyhow::{Context, Result};
use bayesem_classifiers::io::{read_documents, write_predictions, Prediction};
use bayesem_classifiers::model_state::ModelFile;

/// Score every row of `data_path` with the model at `model_path` and write
/// one prediction per row to `output_path`. Returns the number of rows.
pub fn run_predict(model_path: &Path, data_path: &Path, output_path: &Path) -> Result<usize> {
    let mut model_file = ModelFile::load_from_path(model_path)
        .with_context(|| format!("Failed to load model: {}", model_path.display()))?;
    let restored = model_file.restore()?;
    let classifier = restored.precompute();
    log::info!(
        "Loaded {} model with {} labels from {}",
        classifier.name(),
        classifier.labels().len(),
        model_path.display()
    );

    let documents = read_documents(data_path, &mut model_file.features, &mut model_file.labels)?;

    let predictions = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| -> Result<Prediction> {
            let distribution = classifier.predict(&doc.features)?;
            let best_label = classifier.best_label(&doc.features)?;
            Ok(Prediction {
                id: doc.source.clone().unwrap_or_else(|| format!("row_{}", i + 1)),
                best_label,
                distribution,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    write_predictions(
        output_path,
        &predictions,
        &classifier.labels(),
        &model_file.labels,
    )?;
    Ok(predictions.len())
}
