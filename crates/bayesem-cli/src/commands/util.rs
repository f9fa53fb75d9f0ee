use std::path::Path;

use anyhow::Result;

/// Document files are tab-separated; `.tsv` and `.txt` are accepted.
pub fn validate_document_file<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();

    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase());
    if !matches!(ext.as_deref(), Some("tsv") | Some("txt")) {
        anyhow::bail!(
            "Document file must have a .tsv or .txt extension: {}",
            path.display()
        );
    }

    if !path.is_file() {
        anyhow::bail!("Document file does not exist: {}", path.display());
    }

    Ok(())
}
