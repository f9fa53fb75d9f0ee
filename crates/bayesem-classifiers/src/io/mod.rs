//! File formats at the edge of the classifier core.
pub mod document_tsv;

pub use document_tsv::{read_documents, write_predictions, Prediction};
