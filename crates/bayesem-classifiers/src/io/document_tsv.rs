//! Featurised document TSV reader and prediction TSV writer.
//!
//! Input files carry a header with a `features` column (space-separated
//! feature names) and optional `id` and `label` columns. An empty label or
//! `-1` marks a document as unlabelled. Names are mapped to ids through the
//! caller's [`Indexer`]s, which grow as new names appear.
use std::io::{Read, Write};
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;

use crate::data_handling::{Document, Label, LabelDistribution};
use crate::indexer::Indexer;

const UNLABELLED: &str = "-1";

/// One row of a prediction file.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub id: String,
    pub best_label: Label,
    pub distribution: LabelDistribution,
}

/// Read a document TSV file.
pub fn read_documents<P: AsRef<Path>>(
    path: P,
    features: &mut Indexer,
    labels: &mut Indexer,
) -> Result<Vec<Document>> {
    let file = std::fs::File::open(&path)
        .with_context(|| format!("Failed to open document file: {}", path.as_ref().display()))?;
    let documents = read_documents_from(file, features, labels)
        .with_context(|| format!("Failed to parse {}", path.as_ref().display()))?;
    log::info!(
        "Read {} documents from {}",
        documents.len(),
        path.as_ref().display()
    );
    Ok(documents)
}

pub fn read_documents_from<R: Read>(
    input: R,
    features: &mut Indexer,
    labels: &mut Indexer,
) -> Result<Vec<Document>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(input);

    let headers = reader
        .headers()
        .context("Failed to read document header row")?
        .clone();
    let feature_idx = find_column(&headers, "features")
        .ok_or_else(|| anyhow!("Missing 'features' column"))?;
    let label_idx = find_column(&headers, "label");
    let id_idx = find_column(&headers, "id");

    let mut documents = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read row {}", row_idx + 1))?;

        let label = label_idx
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|value| !value.is_empty() && *value != UNLABELLED)
            .map(|value| labels.get_or_insert(value));

        let ids = record
            .get(feature_idx)
            .unwrap_or_default()
            .split_whitespace()
            .map(|name| features.get_or_insert(name))
            .collect();

        let source = id_idx
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("row_{}", row_idx + 1));

        documents.push(Document {
            label,
            features: ids,
            source: Some(source),
        });
    }
    Ok(documents)
}

/// Write predictions as TSV: `id`, `best_label`, then one probability
/// column per entry of `label_order`, headed by the label's name.
pub fn write_predictions<P: AsRef<Path>>(
    path: P,
    predictions: &[Prediction],
    label_order: &[Label],
    labels: &Indexer,
) -> Result<()> {
    let file = std::fs::File::create(&path).with_context(|| {
        format!(
            "Failed to create prediction file: {}",
            path.as_ref().display()
        )
    })?;
    write_predictions_to(file, predictions, label_order, labels)?;
    log::info!(
        "Wrote {} predictions to {}",
        predictions.len(),
        path.as_ref().display()
    );
    Ok(())
}

pub fn write_predictions_to<W: Write>(
    output: W,
    predictions: &[Prediction],
    label_order: &[Label],
    labels: &Indexer,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(output);

    let mut header = vec!["id".to_string(), "best_label".to_string()];
    header.extend(label_order.iter().map(|&l| label_name(labels, l)));
    writer.write_record(&header)?;

    for prediction in predictions {
        let mut row = vec![
            prediction.id.clone(),
            label_name(labels, prediction.best_label),
        ];
        row.extend(label_order.iter().map(|label| {
            let p = prediction.distribution.get(label).copied().unwrap_or(0.0);
            format!("{:.6}", p)
        }));
        writer
            .write_record(&row)
            .with_context(|| format!("Failed to write prediction for {}", prediction.id))?;
    }
    writer.flush().context("Failed to flush prediction output")?;
    Ok(())
}

fn label_name(labels: &Indexer, label: Label) -> String {
    labels
        .name(label)
        .map(str::to_string)
        .unwrap_or_else(|| label.to_string())
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
}
